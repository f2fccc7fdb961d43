//! Pipeline Demo: A decoder thread feeding an interpreter thread.
//!
//! The decoder splits a canned byte stream into reads, turns each read into
//! a batch, and waits on a backpressure gate before handing it over. The
//! interpreter groups coalescable batches and "applies" them by counting
//! lines.
//!
//! Run with `RUST_LOG=tokenbatch=trace` to see batch lifecycle events.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::VecDeque;
use std::thread;
use std::time::Instant;
use tokenbatch::{
    BackpressureGate, BatchGroup, ByteLengths, GateConfig, ReleaseMode, Token, TokenBatch, CR, LF,
};
use tracing_subscriber::EnvFilter;

/// Read size used to split the input.
const READ_SIZE: usize = 37;

/// A toy decoder: printable runs, CR/LF-terminated runs, bare control
/// characters, and CSI sequences.
fn decode(read: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < read.len() {
        match read[i] {
            0x1b => {
                let end = read[i..]
                    .iter()
                    .position(u8::is_ascii_alphabetic)
                    .map_or(read.len(), |p| i + p + 1);
                tokens.push(Token::other(1, &read[i..end]));
                i = end;
            }
            CR if read.get(i + 1) == Some(&LF) => {
                tokens.push(Token::mixed_run(&read[i..i + 2]));
                i += 2;
            }
            byte if byte.is_ascii_control() => {
                tokens.push(Token::control_char(byte));
                i += 1;
            }
            _ => {
                let end = read[i..]
                    .iter()
                    .position(u8::is_ascii_control)
                    .map_or(read.len(), |p| i + p);
                if read.get(end) == Some(&CR) && read.get(end + 1) == Some(&LF) {
                    tokens.push(Token::mixed_run(&read[i..end + 2]));
                    i = end + 2;
                } else {
                    tokens.push(Token::ascii_run(&read[i..end]));
                    i = end;
                }
            }
        }
    }
    tokens
}

fn sample_output() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"\x1b[2J\x1b[H");
    for line in 0..200 {
        out.extend_from_slice(format!("drwxr-xr-x  2 user staff  64 entry-{line:03}\r\n").as_bytes());
    }
    out.extend_from_slice(b"$ \r");
    out.extend_from_slice(b"\r\n");
    out
}

fn decoder(output: &[u8], gate: &BackpressureGate, tx: &Sender<TokenBatch>) {
    for read in output.chunks(READ_SIZE) {
        let tokens = decode(read);
        if tokens.is_empty() {
            continue;
        }
        let signal = gate.acquire();
        let batch = TokenBatch::new(tokens, read.len(), read.len(), Some(signal));
        if tx.send(batch).is_err() {
            break;
        }
    }
}

fn interpreter(rx: &Receiver<TokenBatch>) -> (usize, usize, ByteLengths) {
    let mut queue = VecDeque::new();
    let mut lines = 0;
    let mut groups = 0;
    let mut executed = ByteLengths::default();

    for batch in rx {
        queue.push_back(batch);
        queue.extend(rx.try_iter());

        while let Some(mut group) = BatchGroup::take_from(&mut queue) {
            groups += 1;
            while let Some(token) = group.next() {
                if token.bytes().ends_with(b"\r\n") {
                    lines += 1;
                }
            }
            executed += group.lengths();
            group.release_drained(ReleaseMode::Sync);
        }
    }
    (lines, groups, executed)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("tokenbatch Pipeline Demo");
    println!("========================");

    let output = sample_output();
    let gate = BackpressureGate::new(&GateConfig { depth: 4 });
    let (tx, rx) = bounded::<TokenBatch>(16);
    let start = Instant::now();

    let consumer = thread::spawn(move || interpreter(&rx));
    decoder(&output, &gate, &tx);
    drop(tx);

    let Ok((lines, groups, executed)) = consumer.join() else {
        eprintln!("interpreter thread panicked");
        return;
    };

    println!("bytes in:        {}", output.len());
    println!("bytes executed:  {}", executed.total);
    println!("reads:           {}", output.len().div_ceil(READ_SIZE));
    println!("groups:          {groups}");
    println!("lines:           {lines}");
    println!("free slots:      {}/{}", gate.available_slots(), gate.depth());
    println!("elapsed:         {:?}", start.elapsed());
}
