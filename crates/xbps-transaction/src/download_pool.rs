//! A small scoped worker pool that calls the transport's `fetch` for
//! several archives concurrently, the one place this engine admits
//! internal parallelism (§4.9, §5): the transport's own contract stays
//! a single blocking call per invocation, and parallelism across
//! repositories is entirely this module's doing.
//!
//! Progress notifications cross from worker threads to the caller over
//! a channel and are replayed on the calling thread, so the executor's
//! callback trio is still invoked "synchronously on the executor's
//! thread" as the contract requires, never from a worker.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use xbps_downloader::{FetchOutcome, FetchPhase, Transport};

/// One archive to fetch.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub pkgver: String,
    pub url: String,
    pub target_path: PathBuf,
    pub if_size: Option<u64>,
}

/// A progress notification relayed from a worker thread, owned so it can
/// cross the channel.
#[derive(Debug, Clone)]
pub struct OwnedFetchProgress {
    pub pkgver: String,
    pub total: Option<u64>,
    pub offset: u64,
    pub received: u64,
    pub phase: FetchPhase,
}

enum Event {
    Progress(OwnedFetchProgress),
    Done { pkgver: String, result: Result<FetchOutcome, xbps_downloader::Error> },
}

/// Run every job to completion, relaying progress and results to
/// `on_event` on the calling thread. `on_event` returning `true` requests
/// the pool stop dispatching new jobs (in-flight jobs still finish).
pub fn run_jobs<T, F>(transport: &T, jobs: Vec<FetchJob>, workers: usize, mut on_event: F) -> Vec<(String, Result<FetchOutcome, xbps_downloader::Error>)>
where
    T: Transport + Sync,
    F: FnMut(FetchEvent<'_>) -> bool,
{
    let workers = workers.max(1).min(jobs.len().max(1));
    let queue: Mutex<VecDeque<FetchJob>> = Mutex::new(jobs.into());
    let stop = AtomicBool::new(false);
    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            let stop = &stop;
            scope.spawn(move || loop {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                let job = {
                    let mut guard = queue.lock().expect("fetch job queue poisoned");
                    guard.pop_front()
                };
                let Some(job) = job else { break };

                let pkgver = job.pkgver.clone();
                let tx_progress = tx.clone();
                let pkgver_for_cb = pkgver.clone();
                let on_progress = move |p: xbps_downloader::FetchProgress<'_>| {
                    let _ = tx_progress.send(Event::Progress(OwnedFetchProgress {
                        pkgver: pkgver_for_cb.clone(),
                        total: p.total,
                        offset: p.offset,
                        received: p.received,
                        phase: p.phase,
                    }));
                };

                let result = transport.fetch(&job.url, &job.target_path, None, job.if_size, Some(&on_progress));
                let _ = tx.send(Event::Done { pkgver, result });
            });
        }
        drop(tx);

        let mut outcomes = Vec::new();
        for event in rx {
            match event {
                Event::Progress(p) => {
                    let cancel = on_event(FetchEvent::Progress(&p));
                    if cancel {
                        stop.store(true, Ordering::Relaxed);
                    }
                }
                Event::Done { pkgver, result } => {
                    let cancel = on_event(FetchEvent::Done(&pkgver, &result));
                    if cancel {
                        stop.store(true, Ordering::Relaxed);
                    }
                    outcomes.push((pkgver, result));
                }
            }
        }
        outcomes
    })
}

/// An event surfaced to the caller of [`run_jobs`].
pub enum FetchEvent<'a> {
    Progress(&'a OwnedFetchProgress),
    Done(&'a str, &'a Result<FetchOutcome, xbps_downloader::Error>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::SystemTime;

    struct StubTransport;

    impl Transport for StubTransport {
        fn fetch(
            &self,
            _url: &str,
            _target_path: &Path,
            _if_newer_than: Option<SystemTime>,
            _if_size: Option<u64>,
            on_progress: Option<&xbps_downloader::FetchCallback<'_>>,
        ) -> xbps_downloader::Result<FetchOutcome> {
            if let Some(cb) = on_progress {
                cb(xbps_downloader::FetchProgress { total: Some(10), offset: 10, received: 10, name: "x", phase: FetchPhase::End });
            }
            Ok(FetchOutcome::Downloaded { bytes: 10 })
        }
    }

    #[test]
    fn all_jobs_complete() {
        let jobs = vec![
            FetchJob { pkgver: "a-1.0_0".into(), url: "http://x/a".into(), target_path: PathBuf::from("/tmp/a"), if_size: None },
            FetchJob { pkgver: "b-1.0_0".into(), url: "http://x/b".into(), target_path: PathBuf::from("/tmp/b"), if_size: None },
        ];
        let transport = StubTransport;
        let results = run_jobs(&transport, jobs, 2, |_| false);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }
}
