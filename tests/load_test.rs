//! Load testing for the router.

use std::time::Instant;

use routeman::{HandlerResult, RouteData, Router};

mod common;
use common::{start_router, url};

async fn user_field(data: RouteData) -> HandlerResult {
    let id = data.fields.get("id").unwrap_or_default().to_string();
    data.response.send(id);
    Ok(())
}

#[tokio::test]
async fn test_load_performance() {
    // 1. Setup router with a mix of static and dynamic routes
    let mut router = Router::new();
    router.set_header("X-Powered-By", "routeman").unwrap();
    router.get("/health", user_field).unwrap();
    router.get("/users/@id", user_field).unwrap();
    router.get("/users/@id/@field", user_field).unwrap();

    // 2. Start server
    let (addr, shutdown) = start_router(router).await;

    // 3. Run load test
    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::new();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task in 0..concurrency {
        let client = client.clone();
        let base = url(addr, "/users");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for i in 0..requests_per_task {
                let id = format!("{}-{}", task, i);
                let target = if i % 2 == 0 {
                    format!("{}/{}", base, id)
                } else {
                    format!("{}/{}/email", base, id)
                };

                let req_start = Instant::now();
                if let Ok(res) = client.get(&target).send().await {
                    if res.status().is_success() && res.text().await.ok().as_deref() == Some(id.as_str()) {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_requests, "every request should resolve");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    shutdown.trigger();
}
