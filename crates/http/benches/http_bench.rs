use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ferry_http::codec::{ChunkedDecoder, ChunkedEncoder, RequestDecoder};
use ferry_http::connection::HttpConnection;
use ferry_http::handler::make_handler;
use ferry_http::negotiate::{EncodingConfig, EncodingNegotiator};
use ferry_http::pipeline::TransferPipeline;
use ferry_http::protocol::PayloadItem;
use ferry_http::protocol::body::ReqBody;
use futures::executor::block_on;
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode, header};
use std::{
    error::Error,
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::Decoder;

// Mock IO for testing
#[derive(Clone)]
struct MockIO {
    read_data: Vec<u8>,
    write_data: Vec<u8>,
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: Vec<u8>) -> Self {
        Self { read_data, write_data: Vec::new(), read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        self.write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

async fn test_handler(_req: Request<ReqBody>) -> Result<Response<String>, Box<dyn Error + Send + Sync>> {
    let response = Response::builder().status(StatusCode::OK).body("Hello World!".to_string()).unwrap();
    Ok(response)
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}

fn bench_request_decoder(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::from(&request[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });
}

fn bench_chunked(c: &mut Criterion) {
    let data = payload(256 * 1024);
    let mut group = c.benchmark_group("chunked");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for threshold in [0, 1024, 4096, 16 * 1024] {
        group.bench_with_input(BenchmarkId::new("encode", threshold), &threshold, |b, &threshold| {
            b.iter(|| {
                let mut encoder = ChunkedEncoder::with_threshold(threshold);
                let mut dst = BytesMut::with_capacity(data.len() + 1024);
                for piece in data.chunks(1000) {
                    encoder.write(piece, &mut dst).unwrap();
                }
                encoder.finish(&mut dst).unwrap();
                black_box(dst);
            });
        });
    }

    let mut encoded = BytesMut::new();
    let mut encoder = ChunkedEncoder::new();
    encoder.write(&data, &mut encoded).unwrap();
    encoder.finish(&mut encoded).unwrap();
    let encoded = encoded.freeze();

    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut decoder = ChunkedDecoder::new();
            let mut src = BytesMut::from(&encoded[..]);
            while let Some(item) = decoder.decode(&mut src).unwrap() {
                if item == PayloadItem::Eof {
                    break;
                }
                black_box(item);
            }
        });
    });
    group.finish();
}

fn bench_transfer_pipeline(c: &mut Criterion) {
    let data = payload(64 * 1024);
    let mut request_headers = HeaderMap::new();
    request_headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for gzip in [false, true] {
        let config = EncodingConfig::default().with_gzip(gzip).with_compression_level(6);
        let negotiator = EncodingNegotiator::new(config);
        group.bench_with_input(BenchmarkId::new("gzip", gzip), &negotiator, |b, negotiator| {
            b.iter(|| {
                let decision = negotiator.decide(&request_headers, Some(data.len() as u64), false);
                let mut body = TransferPipeline::begin(&decision, negotiator.config());
                let mut dst = BytesMut::new();
                for piece in data.chunks(8 * 1024) {
                    body.write(piece, &mut dst).unwrap();
                }
                body.finish(&mut dst).unwrap();
                black_box(dst);
            });
        });
    }
    group.finish();
}

fn bench_http_connection(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
    let handler = Arc::new(make_handler(test_handler));

    c.bench_function("process_simple_request", |b| {
        b.iter(|| {
            let mock_io = MockIO::new(request.to_vec());
            let (reader, writer) = (mock_io.clone(), mock_io);
            let connection = HttpConnection::new(reader, writer);
            black_box(block_on(connection.process(handler.clone())).unwrap());
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_chunked, bench_transfer_pipeline, bench_http_connection);
criterion_main!(benches);
