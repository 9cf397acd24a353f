use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use pipeq::codec::{Decoder, JsonLineCodec};
use pipeq::command::Command;
use pipeq::completion::Completion;
use pipeq::coordinator::Coordinator;
use pipeq::error::ConnectionError;
use pipeq::transport::{OutboundSink, WriteStatus};

struct NullSink;

impl OutboundSink for NullSink {
    fn write_outbound(&mut self, command: Command) -> Result<WriteStatus, ConnectionError> {
        black_box(command);
        Ok(WriteStatus::Accepted)
    }

    fn close_connection(&mut self) {}
}

fn bench_submit_dispatch(c: &mut Criterion) {
    c.bench_function("submit+dispatch 1000 pipelined", |b| {
        b.iter_batched(
            || Coordinator::<NullSink, String>::new(NullSink),
            |mut coordinator| {
                let mut replies = Vec::with_capacity(1000);
                for _ in 0..1000 {
                    let (completion, reply) = Completion::channel();
                    let _ = coordinator.submit(Command::from("PING\n"), completion);
                    replies.push(reply);
                }
                for _ in 0..1000 {
                    let _ = coordinator.on_inbound_value("PONG".to_string());
                }
                black_box(replies)
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_decode(c: &mut Criterion) {
    let frame = b"{\"type\":\"Ok\",\"value\":{\"key\":\"a\",\"n\":42}}\n".repeat(100);

    c.bench_function("json-line decode 100 frames", |b| {
        b.iter(|| {
            let mut codec = JsonLineCodec::default();
            let mut buf = frame.clone();
            while let Ok(Some(reply)) = codec.decode(&mut buf) {
                black_box(reply);
            }
        });
    });
}

criterion_group!(benches, bench_submit_dispatch, bench_decode);
criterion_main!(benches);
