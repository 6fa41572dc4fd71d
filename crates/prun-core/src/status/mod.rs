//! The single writer of terminal output.
//!
//! [`StatusAggregator`] owns the counters, the live lines and the [`Renderer`]. Workers and the
//! dispatcher only ever talk to it through channels.

mod format;
pub use format::{DisplayOptions, ERROR_MARKER, Header, format_duration};

mod state;
pub use state::AggregateState;

use std::{
    io,
    time::{Duration, Instant},
};

use time::OffsetDateTime;
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, sleep},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use prun_model::{CountUpdate, EventKind, StatusEvent};

use crate::{
    eta::Eta,
    term::{Console, Renderer},
};

/// Refresh period of the status block.
pub const TICK: Duration = Duration::from_millis(200);
/// How long events are still drained after an interrupt.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Final numbers of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub processed: u64,
    pub failed: u64,
    pub elapsed: Duration,
    pub interrupted: bool,
}

pub struct StatusAggregator<C> {
    renderer: Renderer<C>,
    display: DisplayOptions,
    workers: usize,
    state: AggregateState,
    eta: Eta,
    degraded: bool,
    interrupted: bool,
}

impl<C: Console> StatusAggregator<C> {
    pub fn new(console: C, workers: usize, display: DisplayOptions) -> Self {
        let start = Instant::now();
        Self {
            renderer: Renderer::new(console),
            display,
            workers,
            state: AggregateState::new(start),
            eta: Eta::new(start, 0),
            degraded: false,
            interrupted: false,
        }
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    /// True after a terminal write failed; nothing is written from then on.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Consume events until every worker is gone, then print the summary.
    ///
    /// After `cancel` fires, events are drained for at most [`SHUTDOWN_GRACE`] so that the
    /// `Done` events of killed jobs still make it into the transcript.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<StatusEvent>,
        mut counts: mpsc::Receiver<CountUpdate>,
        cancel: CancellationToken,
    ) -> Summary {
        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut counts_open = true;
        let grace = sleep(SHUTDOWN_GRACE);
        tokio::pin!(grace);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                update = counts.recv(), if counts_open => match update {
                    Some(update) => self.handle_count(update),
                    None => counts_open = false,
                },
                _ = ticker.tick() => {}
                _ = cancel.cancelled(), if !self.interrupted => {
                    debug!(target: "prun.core.status", "interrupted; draining events");
                    self.interrupted = true;
                    grace.as_mut().reset(tokio::time::Instant::now() + SHUTDOWN_GRACE);
                }
                _ = &mut grace, if self.interrupted => {
                    warn!(target: "prun.core.status", "gave up waiting for workers after interrupt");
                    break;
                }
            }
            self.redraw_at(Instant::now());
        }

        self.finish()
    }

    pub fn handle_event(&mut self, event: StatusEvent) {
        let StatusEvent { id, tag, kind } = event;
        match kind {
            EventKind::Start => {
                trace!(target: "prun.core.status", id, %tag, "start");
                self.state.started(&tag);
            }
            EventKind::Output { line, stream } => {
                let message = format::output_message(&line, stream.is_stderr());
                let text = self.display.transcript_line(id, &tag, now_utc(), &message);
                self.transcript(&text);
                self.state.output(&tag, &message);
            }
            EventKind::Done { error } => {
                trace!(target: "prun.core.status", id, %tag, failed = error.is_some(), "done");
                self.state.finished(&tag, error.is_some());
                self.eta.report(self.state.processed);
                let message = format::done_message(error.as_deref());
                let text = self.display.transcript_line(id, &tag, now_utc(), &message);
                self.transcript(&text);
            }
        }
    }

    pub fn handle_count(&mut self, update: CountUpdate) {
        trace!(target: "prun.core.status", ?update, "count");
        match update {
            CountUpdate::Running(n) => self.state.running_count(n),
            CountUpdate::Total(n) => {
                self.state.final_count(n);
                self.eta.set_total(n);
            }
        }
    }

    /// Rebuild the status block: header, then one line per live tag in tag order.
    pub fn redraw_at(&mut self, now: Instant) {
        if self.degraded || !self.renderer.is_interactive() {
            return;
        }

        let eta = if self.state.total_known {
            self.eta.visible_at(now)
        } else {
            None
        };
        let header = Header {
            elapsed: now.saturating_duration_since(self.state.start),
            processed: self.state.processed,
            failed: self.state.failed,
            total: self.state.total_known.then_some(self.state.total),
            seen: self.state.total,
            eta,
            live: self.state.live.len(),
            workers: self.workers,
        };

        let mut lines = Vec::with_capacity(self.state.live.len() + 1);
        lines.push(header.render());
        lines.extend(
            self.state
                .live
                .iter()
                .map(|(tag, last)| format::live_line(tag, last)),
        );

        if let Err(e) = self.renderer.set_status_at(lines, now) {
            self.degrade(e);
        }
    }

    /// Clear the block and print the summary. Consumes the aggregator.
    pub fn finish(mut self) -> Summary {
        let summary = Summary {
            processed: self.state.processed,
            failed: self.state.failed,
            elapsed: self.state.start.elapsed(),
            interrupted: self.interrupted,
        };

        if !self.degraded
            && let Err(e) = self.renderer.finish()
        {
            self.degrade(e);
        }
        self.transcript("");
        let text = format::summary_line(summary.processed, summary.failed, summary.elapsed);
        self.transcript(&text);
        if summary.interrupted {
            self.transcript("interrupted");
        }

        debug!(
            target: "prun.core.status",
            processed = summary.processed,
            failed = summary.failed,
            interrupted = summary.interrupted,
            "finished"
        );
        summary
    }

    fn transcript(&mut self, line: &str) {
        if self.degraded {
            return;
        }
        if let Err(e) = self.renderer.write_transcript_line(line) {
            self.degrade(e);
        }
    }

    fn degrade(&mut self, e: io::Error) {
        if !self.degraded {
            warn!(target: "prun.core.status", error = %e, "terminal write failed; output disabled");
            self.degraded = true;
        }
    }
}

fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

#[cfg(test)]
mod tests {
    use prun_model::{Job, Stream};

    use super::*;
    use crate::term::MemoryConsole;

    fn quiet() -> DisplayOptions {
        DisplayOptions {
            show_timestamp: false,
            ..DisplayOptions::default()
        }
    }

    fn job(id: u64, tag: &str) -> Job {
        Job::new(id, tag, "true", Vec::new())
    }

    #[test]
    fn transcript_marks_stderr_and_outcome() {
        let console = MemoryConsole::redirected();
        let mut agg = StatusAggregator::new(console.clone(), 2, quiet());
        let a = job(1, "a");
        let b = job(2, "b");

        agg.handle_event(StatusEvent::start(&a));
        agg.handle_event(StatusEvent::output(&a, "hello", Stream::Stdout));
        agg.handle_event(StatusEvent::output(&a, "bad", Stream::Stderr));
        agg.handle_event(StatusEvent::done(&a, None));
        agg.handle_event(StatusEvent::start(&b));
        agg.handle_event(StatusEvent::done(&b, Some("exit status 1".into())));
        let summary = agg.finish();

        assert_eq!((summary.processed, summary.failed), (2, 1));
        assert!(!summary.interrupted);
        assert_eq!(
            console.contents(),
            "1 a hello\n1 a error bad\n1 a done\n2 b error exit status 1\n\n\
             processed 2 items (1 failures) in 0:00\n"
        );
    }

    #[test]
    fn status_block_lists_live_tags_in_order() {
        let console = MemoryConsole::interactive(Some(120));
        let mut agg = StatusAggregator::new(console.clone(), 4, quiet());
        let b = job(1, "b");
        let a = job(2, "a");

        agg.handle_count(CountUpdate::Total(3));
        agg.handle_event(StatusEvent::start(&b));
        agg.handle_event(StatusEvent::start(&a));
        agg.handle_event(StatusEvent::output(&b, "half way", Stream::Stdout));
        agg.redraw_at(Instant::now());

        let out = console.contents();
        assert!(out.ends_with("0/3 processed (0 failed), 2/4 workers:\na\nb half way"), "{out:?}");
        assert!(out.starts_with("1 b half way\n[0:00] "), "{out:?}");
    }

    #[test]
    fn stderr_live_line_is_marked() {
        let console = MemoryConsole::interactive(Some(120));
        let mut agg = StatusAggregator::new(console.clone(), 1, quiet());
        let a = job(1, "a");

        agg.handle_event(StatusEvent::start(&a));
        agg.handle_event(StatusEvent::output(&a, "disk full", Stream::Stderr));

        assert_eq!(
            agg.state().live.get("a").map(String::as_str),
            Some("error disk full")
        );
    }

    #[test]
    fn unknown_total_is_a_lower_bound() {
        let console = MemoryConsole::interactive(Some(120));
        let mut agg = StatusAggregator::new(console.clone(), 1, quiet());

        agg.handle_count(CountUpdate::Running(10));
        agg.redraw_at(Instant::now());

        assert!(console.contents().contains("0/10+ processed (0 failed), 0/1 workers:"));
    }

    #[test]
    fn redirected_output_has_no_status_block() {
        let console = MemoryConsole::redirected();
        let mut agg = StatusAggregator::new(console.clone(), 1, quiet());

        agg.handle_count(CountUpdate::Total(1));
        agg.handle_event(StatusEvent::start(&job(1, "a")));
        agg.redraw_at(Instant::now());

        assert_eq!(console.contents(), "");
    }

    #[test]
    fn closed_terminal_degrades_without_losing_counts() {
        let console = MemoryConsole::interactive(None);
        console.close();
        let mut agg = StatusAggregator::new(console.clone(), 1, quiet());
        let a = job(1, "a");

        agg.handle_event(StatusEvent::start(&a));
        agg.handle_event(StatusEvent::output(&a, "lost", Stream::Stdout));
        assert!(agg.is_degraded());
        agg.handle_event(StatusEvent::done(&a, None));
        agg.redraw_at(Instant::now());

        let summary = agg.finish();
        assert_eq!(summary.processed, 1);
        assert_eq!(console.contents(), "");
    }

    #[tokio::test]
    async fn run_finishes_when_workers_hang_up() {
        let console = MemoryConsole::redirected();
        let agg = StatusAggregator::new(console.clone(), 2, quiet());
        let (ev_tx, ev_rx) = mpsc::channel(16);
        let (count_tx, count_rx) = mpsc::channel(4);

        let handle = tokio::spawn(agg.run(ev_rx, count_rx, CancellationToken::new()));

        for (id, tag) in [(1, "x"), (2, "y")] {
            let j = job(id, tag);
            ev_tx.send(StatusEvent::start(&j)).await.unwrap();
            ev_tx.send(StatusEvent::output(&j, tag, Stream::Stdout)).await.unwrap();
            let error = (id == 2).then(|| "exit status 1".to_string());
            ev_tx.send(StatusEvent::done(&j, error)).await.unwrap();
        }
        count_tx.send(CountUpdate::Total(2)).await.unwrap();
        drop(count_tx);
        drop(ev_tx);

        let summary = handle.await.unwrap();
        assert_eq!((summary.processed, summary.failed), (2, 1));
        assert!(console.contents().contains("processed 2 items (1 failures)"));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_stops_waiting_after_grace() {
        let console = MemoryConsole::redirected();
        let agg = StatusAggregator::new(console.clone(), 1, quiet());
        let (ev_tx, ev_rx) = mpsc::channel::<StatusEvent>(4);
        let (_count_tx, count_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(agg.run(ev_rx, count_rx, cancel.clone()));
        let a = job(1, "a");
        ev_tx.send(StatusEvent::start(&a)).await.unwrap();
        cancel.cancel();

        let summary = handle.await.unwrap();
        assert!(summary.interrupted);
        assert_eq!(summary.processed, 0);
        assert!(console.contents().ends_with("\ninterrupted\n"));
        drop(ev_tx);
    }
}
