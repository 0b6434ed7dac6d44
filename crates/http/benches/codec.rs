use bytes::{Bytes, BytesMut};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response};
use micro_gateway_http::codec::{RequestDecoder, ResponseEncoder};
use std::hint::black_box;
use tokio_util::codec::{Decoder, Encoder};

const SMALL_REQUEST: &[u8] = b"POST /gateway HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";

const ENVELOPE_REQUEST: &[u8] = b"POST /gateway HTTP/1.1\r\n\
Host: gateway.example.com\r\n\
User-Agent: curl/8.5.0\r\n\
Accept: application/json\r\n\
Content-Type: application/json\r\n\
X-Forwarded-For: 1.2.3.4, 10.0.0.1\r\n\
X-Real-Ip: 1.2.3.4\r\n\
Content-Length: 111\r\n\
\r\n\
{\"Version\":\"v1\",\"Service\":\"User\",\"Module\":\"Core\",\"Controller\":\"Account\",\"Action\":\"Get\",\"request\":{\"id\":123456}}";

fn bench_request_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("request_decoder");

    for (name, input) in [("small", SMALL_REQUEST), ("envelope", ENVELOPE_REQUEST)] {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            let mut request_decoder = RequestDecoder::new();
            b.iter_batched_ref(
                || BytesMut::from(*input),
                |bytes_mut| {
                    let request = request_decoder.decode(bytes_mut).expect("input should be a valid request").expect("complete request");
                    black_box(request);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_response_encoder(criterion: &mut Criterion) {
    let mut response = Response::new(Bytes::from_static(br#"{"errCode":0,"errMsg":"","result":{"id":123456}}"#));
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));

    criterion.bench_function("response_encoder", |b| {
        let mut encoder = ResponseEncoder::new();
        b.iter_batched_ref(
            || (response.clone(), BytesMut::with_capacity(256)),
            |(response, bytes_mut)| {
                encoder.encode(std::mem::take(response), bytes_mut).expect("response should be encodable");
                black_box(bytes_mut);
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(codec, bench_request_decoder, bench_response_encoder);
criterion_main!(codec);
