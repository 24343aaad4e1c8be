use bytes::Bytes;
use futures::StreamExt;
use keyforge_crypto::{
    ByteStream, CryptoError, SessionSecret, StreamDecryptor, StreamEncryptor,
    NONCE_PREFIX_SIZE,
};

fn secret() -> SessionSecret {
    SessionSecret::from_bytes([42u8; 32])
}

fn chunk_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
    Box::pin(futures::stream::iter(
        chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
    ))
}

async fn collect(stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    let mut stream = stream;
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

// ── Chunk API ───────────────────────────────────────────────────

#[test]
fn chunk_roundtrip() {
    let mut enc = StreamEncryptor::with_prefix(&secret(), [9u8; NONCE_PREFIX_SIZE]);
    let mut dec = StreamDecryptor::from_header(&secret(), enc.header());

    let frame = enc.encrypt_chunk(b"hello release bytes").unwrap();
    // Frame is length-prefixed; the ciphertext follows the 4-byte header.
    let plain = dec.decrypt_chunk(&frame[4..]).unwrap();
    assert_eq!(plain, b"hello release bytes");
}

#[test]
fn frames_are_position_bound() {
    let mut enc = StreamEncryptor::with_prefix(&secret(), [9u8; NONCE_PREFIX_SIZE]);
    let first = enc.encrypt_chunk(b"first").unwrap();
    let second = enc.encrypt_chunk(b"second").unwrap();

    // Decrypting the second frame at the first position must fail.
    let mut dec = StreamDecryptor::from_header(&secret(), [9u8; NONCE_PREFIX_SIZE]);
    assert!(dec.decrypt_chunk(&second[4..]).is_err());

    // In order, both decrypt.
    let mut dec = StreamDecryptor::from_header(&secret(), [9u8; NONCE_PREFIX_SIZE]);
    assert_eq!(dec.decrypt_chunk(&first[4..]).unwrap(), b"first");
    assert_eq!(dec.decrypt_chunk(&second[4..]).unwrap(), b"second");
}

#[test]
fn wrong_key_fails() {
    let mut enc = StreamEncryptor::with_prefix(&secret(), [9u8; NONCE_PREFIX_SIZE]);
    let frame = enc.encrypt_chunk(b"data").unwrap();

    let other = SessionSecret::from_bytes([43u8; 32]);
    let mut dec = StreamDecryptor::from_header(&other, [9u8; NONCE_PREFIX_SIZE]);
    let err = dec.decrypt_chunk(&frame[4..]).unwrap_err();
    assert!(matches!(err, CryptoError::Decryption(_)));
}

// ── Stream transform ────────────────────────────────────────────

#[tokio::test]
async fn stream_roundtrip_multi_chunk() {
    let enc = StreamEncryptor::new(&secret());
    let source = chunk_stream(vec![b"alpha ", b"beta ", b"gamma"]);

    let wire = collect(enc.encrypt_stream(source)).await;
    let plain = StreamDecryptor::decrypt_all(&secret(), &wire).unwrap();
    assert_eq!(plain, b"alpha beta gamma");
}

#[tokio::test]
async fn stream_starts_with_header() {
    let enc = StreamEncryptor::with_prefix(&secret(), [5u8; NONCE_PREFIX_SIZE]);
    let wire = collect(enc.encrypt_stream(chunk_stream(vec![b"x"]))).await;
    assert_eq!(&wire[..NONCE_PREFIX_SIZE], &[5u8; NONCE_PREFIX_SIZE]);
}

#[tokio::test]
async fn stream_output_differs_from_plaintext() {
    let enc = StreamEncryptor::new(&secret());
    let wire = collect(enc.encrypt_stream(chunk_stream(vec![b"plaintext body"]))).await;
    assert!(!wire
        .windows(b"plaintext body".len())
        .any(|w| w == b"plaintext body"));
}

#[tokio::test]
async fn source_errors_pass_through() {
    let enc = StreamEncryptor::new(&secret());
    let source: ByteStream = Box::pin(futures::stream::iter(vec![
        Ok(Bytes::from_static(b"ok")),
        Err(std::io::Error::other("disk gone")),
    ]));

    let mut stream = enc.encrypt_stream(source);
    assert!(stream.next().await.unwrap().is_ok()); // header
    assert!(stream.next().await.unwrap().is_ok()); // first frame
    assert!(stream.next().await.unwrap().is_err());
}

// ── decrypt_all failure modes ───────────────────────────────────

#[test]
fn truncated_stream_fails() {
    let mut enc = StreamEncryptor::with_prefix(&secret(), [1u8; NONCE_PREFIX_SIZE]);
    let mut wire = enc.header().to_vec();
    wire.extend_from_slice(&enc.encrypt_chunk(b"complete frame").unwrap());
    wire.truncate(wire.len() - 3);

    assert!(StreamDecryptor::decrypt_all(&secret(), &wire).is_err());
}

#[test]
fn missing_header_fails() {
    assert!(StreamDecryptor::decrypt_all(&secret(), &[1, 2, 3]).is_err());
}

#[test]
fn empty_stream_decrypts_to_empty() {
    let wire = [0u8; NONCE_PREFIX_SIZE];
    let plain = StreamDecryptor::decrypt_all(&secret(), &wire).unwrap();
    assert!(plain.is_empty());
}
