//! Many concurrent intercepts against one chain: every request is
//! audited exactly once, sequences stay contiguous, and the chain
//! verifies.

use std::sync::Arc;
use vigil_audit::verify_chain;
use vigil_core::{AccessRequest, AgentId, Verdict};
use vigil_integration_tests::World;
use vigil_intercept::{CooperativeInterceptor, ThreadedInterceptor};

const TOTAL: usize = 50;
const ALLOWED: usize = 30;

fn request_for(agent_id: AgentId, i: usize) -> AccessRequest {
    // The first ALLOWED requests hit the allow policy, the rest the
    // deny policy - deterministic regardless of interleaving.
    let domain = if i < ALLOWED {
        format!("svc{i}.ok.example.com")
    } else {
        format!("svc{i}.blocked.example.com")
    };
    AccessRequest::get(agent_id, domain, "/")
}

fn check_store(store: &vigil_store::ColumnarStore) {
    let entries = store.snapshot_all().expect("snapshot");
    assert_eq!(entries.len(), TOTAL);

    // Sequences are exactly 0..TOTAL-1, no gaps, no duplicates.
    let seqs: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
    assert_eq!(seqs, (0..TOTAL as u64).collect::<Vec<u64>>());

    // Exactly the allowed subset was permitted.
    let allowed = store.query_by_verdict(Verdict::Allow).expect("query");
    assert_eq!(allowed.len(), ALLOWED);

    assert!(verify_chain(&entries).is_valid());
}

#[test]
fn fifty_threads_produce_a_valid_chain() {
    let world = World::new();
    let fixture = world.chain();
    let interceptor = Arc::new(ThreadedInterceptor::new(fixture.pipeline));

    std::thread::scope(|scope| {
        for i in 0..TOTAL {
            let interceptor = Arc::clone(&interceptor);
            let request = request_for(world.agent_id, i);
            scope.spawn(move || {
                interceptor.intercept(&request).expect("intercept");
            });
        }
    });

    assert_eq!(interceptor.requests_processed(), TOTAL as u64);
    check_store(&fixture.store);

    drop(interceptor);
    fixture.writer.shutdown();
}

#[test]
fn fifty_cooperative_tasks_produce_a_valid_chain() {
    let world = World::new();
    let fixture = world.chain();
    let interceptor = Arc::new(CooperativeInterceptor::new(fixture.pipeline));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("build runtime");

    runtime.block_on(async {
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..TOTAL {
            let interceptor = Arc::clone(&interceptor);
            let request = request_for(world.agent_id, i);
            tasks.spawn(async move {
                interceptor.intercept(&request).await.expect("intercept");
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.expect("task panicked");
        }
    });

    check_store(&fixture.store);

    drop(interceptor);
    fixture.writer.shutdown();
}
