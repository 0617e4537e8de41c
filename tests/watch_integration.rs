use inner_bloom::config::BloomParams;
use inner_bloom::events::ParamChange;
use inner_bloom::tasks::watch;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn next_change(rx: &mut mpsc::Receiver<ParamChange>) -> ParamChange {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout waiting for param change")
        .expect("watcher channel closed")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn config_edits_become_param_changes() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("bloom.yaml");
    fs::write(&path, "params:\n  grid-size: 32\n").unwrap();
    let initial = BloomParams {
        grid_size: 32,
        ..BloomParams::default()
    };

    let (tx, mut rx) = mpsc::channel::<ParamChange>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch::run(path.clone(), initial, tx, cancel.clone()));

    // let the watcher register before editing
    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::write(&path, "params:\n  grid-size: 32\n  wave-amplitude: 0.5\n").unwrap();

    assert_eq!(next_change(&mut rx).await, ParamChange::WaveAmplitude(0.5));

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn broken_edit_is_skipped_until_fixed() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("bloom.yaml");
    fs::write(&path, "{}\n").unwrap();

    let (tx, mut rx) = mpsc::channel::<ParamChange>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch::run(
        path.clone(),
        BloomParams::default(),
        tx,
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::write(&path, "params:\n  grid-size: 0\n").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::write(&path, "params:\n  grid-size: 48\n").unwrap();

    assert_eq!(next_change(&mut rx).await, ParamChange::GridSize(48));

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_stops_the_watcher() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("bloom.yaml");
    fs::write(&path, "{}\n").unwrap();

    let (tx, _rx) = mpsc::channel::<ParamChange>(1);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch::run(path, BloomParams::default(), tx, cancel.clone()));
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("watcher did not stop")
        .unwrap()
        .unwrap();
}
