use std::io::Read;
use std::thread;
use std::time::Duration;

use rand::RngCore;
use streamkit::{pipe, BitReader, BitWriter, Error};

#[test]
fn threaded_producer_consumer_round_trips() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut payload = vec![0u8; 1 << 20];
    rand::thread_rng().fill_bytes(&mut payload);
    let expected = payload.clone();

    // An odd capacity forces plenty of wraparound.
    let (mut reader, writer) = pipe(997);
    let producer = thread::spawn(move || {
        for chunk in payload.chunks(4096) {
            writer.write_all(chunk).unwrap();
        }
        // Dropping the writer closes the write end.
    });

    let mut received = Vec::new();
    reader.read_to_end(&mut received).unwrap();
    producer.join().unwrap();
    assert_eq!(received, expected);
}

#[test]
fn reader_close_unblocks_a_blocked_writer() {
    let (reader, writer) = pipe(4);
    writer.write_all(b"full").unwrap();

    let closer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        reader.close();
    });

    // Blocks on the full buffer until the reader closes, then errors out
    // instead of hanging.
    assert!(matches!(writer.write_all(b"more"), Err(Error::PipeClosed)));
    closer.join().unwrap();
}

#[test]
fn writer_close_unblocks_a_blocked_reader() {
    let (reader, writer) = pipe(4);

    let closer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        writer.close();
    });

    let mut buf = [0u8; 1];
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
    closer.join().unwrap();
}

#[test]
fn drain_then_eof_after_writer_close() {
    let (reader, writer) = pipe(64);
    writer.write_all(b"remaining bytes").unwrap();
    writer.close();

    let mut buf = [0u8; 64];
    let n = reader.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"remaining bytes");
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
}

#[test]
fn bit_streams_compose_over_a_pipe() {
    let (reader, writer) = pipe(64);

    let producer = thread::spawn(move || {
        let mut bits = BitWriter::new(writer);
        bits.write_bits(0xE6D, 12).unwrap();
        bits.write_bytes(b"payload").unwrap();
        let writer = bits.finish().unwrap();
        writer.close();
    });

    let mut bits = BitReader::new(reader);
    assert_eq!(bits.read_bits_exact(12).unwrap(), 0xE6D);
    let mut buf = [0u8; 7];
    bits.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"payload");
    producer.join().unwrap();
}
