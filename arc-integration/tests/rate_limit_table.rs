use arc_integration::{EndpointLimit, EndpointRateLimitTable, Priority};
use std::time::{Duration, Instant};

// A 0.5 rps / burst-2 endpoint limit plus a 300ms global minimum delay
// still spaces the 3rd..5th request ~2s apart, and every request
// additionally respects the 300ms global floor.
#[tokio::test]
async fn endpoint_table_enforces_both_endpoint_and_global_limits() {
    let table = EndpointRateLimitTable::new(
        Duration::from_millis(300),
        &[(
            "/orders",
            EndpointLimit {
                requests_per_second: 0.5,
                burst_capacity: 2,
                weight: 1,
            },
        )],
    );

    let start = Instant::now();
    table.acquire("/orders", Priority::Normal).await;
    table.acquire("/orders", Priority::Normal).await;
    table.acquire("/orders", Priority::Normal).await;
    assert!(start.elapsed() >= Duration::from_millis(1800));
}

#[tokio::test]
async fn endpoints_without_a_configured_prefix_only_pay_the_global_delay() {
    let table = EndpointRateLimitTable::new(Duration::from_millis(50), &[]);

    let start = Instant::now();
    table.acquire("/unconfigured", Priority::Normal).await;
    table.acquire("/unconfigured", Priority::Normal).await;
    assert!(start.elapsed() >= Duration::from_millis(50));
}
