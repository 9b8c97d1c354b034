//! 分发器性能基准测试
//!
//! 测试覆盖：
//! - 按渠道格式化内容
//! - 注册表查找
//! - 不同渠道数量下的完整分发

use std::hint::black_box;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use notification_dispatcher::{
    ChannelRegistry, Content, ContentFormatter, DeliveryReceipt, DispatcherConfig,
    NotificationChannel, NotificationDispatcher, Result,
};

/// 立即成功的渠道，排除投递开销
struct NoopChannel {
    name: String,
}

#[async_trait]
impl NotificationChannel for NoopChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _recipient: &str, _content: &Content) -> Result<DeliveryReceipt> {
        Ok(DeliveryReceipt::new("noop"))
    }
}

fn create_content() -> Content {
    Content::new("Order Confirmed", "Total: $42 ".repeat(20))
        .unwrap()
        .with_action_url("https://x/o/1")
        .with_action_text("View")
}

fn create_registry(channel_count: usize) -> Arc<ChannelRegistry> {
    let registry = ChannelRegistry::new();
    for i in 0..channel_count {
        registry.register(Arc::new(NoopChannel {
            name: format!("channel_{i}"),
        }));
    }
    Arc::new(registry)
}

/// 格式化基准
fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");
    let formatter = ContentFormatter::with_defaults();
    let content = create_content();

    for channel in ["Email", "SMS", "Push"] {
        group.bench_function(channel, |b| {
            b.iter(|| formatter.format(black_box(channel), black_box(&content)))
        });
    }

    group.finish();
}

/// 注册表查找基准
fn bench_registry_resolve(c: &mut Criterion) {
    let registry = create_registry(32);

    c.bench_function("registry_resolve", |b| {
        b.iter(|| registry.resolve(black_box("CHANNEL_16")))
    });
}

/// 完整分发基准
fn bench_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let content = create_content();

    let mut group = c.benchmark_group("dispatch");
    for channel_count in [1, 3, 10] {
        let dispatcher = NotificationDispatcher::with_registry(
            create_registry(channel_count),
            DispatcherConfig::default(),
        );

        group.throughput(Throughput::Elements(channel_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(channel_count),
            &channel_count,
            |b, _| {
                b.iter(|| {
                    runtime.block_on(dispatcher.dispatch(
                        black_box("user-1"),
                        black_box("user@example.com"),
                        black_box(&content),
                        None,
                    ))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_format, bench_registry_resolve, bench_dispatch);
criterion_main!(benches);
