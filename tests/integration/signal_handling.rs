use std::sync::Arc;
use std::time::Duration;

use crate::support::{candles, MemoryFileSystem, Reply, ScriptedTransport};
use finam_exporter::cancel::CancellationSignal;
use finam_exporter::credentials::StaticCredentials;
use finam_exporter::export::{ExportState, ProgressLog};
use finam_exporter::{ExportError, ExportOrchestrator, ExportRequest, Granularity, ProgressEvent};

#[tokio::test]
async fn cancel_notifies_waiters() {
    let signal = CancellationSignal::shared();
    let waiter = {
        let handle = Arc::clone(&signal);
        tokio::spawn(async move {
            handle.cancelled().await;
            true
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    signal.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok());
}

/// Cancelling before waiting must not deadlock.
#[tokio::test]
async fn cancel_before_wait_returns_immediately() {
    let signal = CancellationSignal::shared();
    signal.cancel();

    let handle = Arc::clone(&signal);
    let waiter = tokio::spawn(async move {
        handle.cancelled().await;
        true
    });

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok(), "cancelled() hung although the signal was already raised");
}

#[tokio::test]
async fn cancel_reaches_all_concurrent_waiters() {
    let signal = CancellationSignal::shared();
    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let handle = Arc::clone(&signal);
            tokio::spawn(async move { handle.sleep(Duration::from_secs(3600)).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    signal.cancel();

    for waiter in waiters {
        let completed = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(!completed);
    }
}

#[tokio::test(start_paused = true)]
async fn cancel_during_inter_segment_delay_aborts_run() {
    let transport = Arc::new(ScriptedTransport::new([
        Reply::Body(candles(3, 2)),
        Reply::Body(candles(10, 2)),
    ]));
    let orchestrator = Arc::new(
        ExportOrchestrator::new(Arc::new(StaticCredentials::new("tok")))
            .with_transport(transport.clone())
            .with_file_system(Arc::new(MemoryFileSystem::new()))
            .with_inter_segment_delay(Duration::from_secs(30)),
    );
    let log = Arc::new(ProgressLog::new());

    let run = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        let log = Arc::clone(&log);
        async move {
            let request = ExportRequest::for_year("SBER", "3", Granularity::OneHour, 2023);
            orchestrator.run(&request, &*log).await
        }
    });

    // Wait until the second segment has started its courtesy delay
    while !log
        .events()
        .contains(&ProgressEvent::SegmentStarted { index: 2, total: 4 })
    {
        tokio::task::yield_now().await;
    }
    orchestrator.cancel();

    let result = run.await.unwrap();
    assert!(matches!(result, Err(ExportError::Cancelled)));
    assert_eq!(transport.call_count(), 1);
    assert_eq!(orchestrator.state(), ExportState::Errored);
    assert!(orchestrator.cancellation().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn running_orchestrator_always_has_a_cancellable_signal() {
    let transport = Arc::new(ScriptedTransport::new([Reply::Hang]));
    let orchestrator = Arc::new(
        ExportOrchestrator::new(Arc::new(StaticCredentials::new("tok")))
            .with_transport(transport)
            .with_file_system(Arc::new(MemoryFileSystem::new())),
    );
    let log = Arc::new(ProgressLog::new());

    let run = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        let log = Arc::clone(&log);
        async move {
            let request = ExportRequest::for_year("SBER", "3", Granularity::Daily, 2023);
            orchestrator.run(&request, &*log).await
        }
    });

    while !orchestrator.is_running() {
        std::hint::spin_loop();
    }
    assert!(orchestrator.cancellation().is_some());
    orchestrator.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(ExportError::Cancelled)));
    assert_eq!(log.events().last(), Some(&ProgressEvent::Cancelled));
    assert!(!orchestrator.is_running());
}
