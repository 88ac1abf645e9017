use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

//------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    Success,
    Fatal,
}

use ReportOutcome::*;

impl ReportOutcome {
    pub fn combine(lhs: &ReportOutcome, rhs: &ReportOutcome) -> ReportOutcome {
        match (lhs, rhs) {
            (Success, Success) => Success,
            _ => Fatal,
        }
    }
}

pub struct Report {
    outcome: Mutex<ReportOutcome>,
    inner: Mutex<Box<dyn ReportInner + Send>>,
}

pub trait ReportInner {
    fn set_sub_title(&mut self, txt: &str);
    fn progress(&mut self, percent: u8);
    fn log(&mut self, txt: &str);
    fn complete(&mut self);
}

// poisoned locks are recovered
fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Report {
    pub fn new(inner: Box<dyn ReportInner + Send>) -> Report {
        Report {
            outcome: Mutex::new(Success),
            inner: Mutex::new(inner),
        }
    }

    fn update_outcome(&self, rhs: ReportOutcome) {
        let mut lhs = lock(&self.outcome);
        *lhs = ReportOutcome::combine(&lhs, &rhs);
    }

    pub fn set_sub_title(&self, txt: &str) {
        lock(&self.inner).set_sub_title(txt)
    }

    pub fn progress(&self, percent: u8) {
        lock(&self.inner).progress(percent)
    }

    pub fn fatal(&self, txt: &str) {
        self.update_outcome(Fatal);
        lock(&self.inner).log(txt)
    }

    /// Takes down any progress display, ready for output on stdout.
    pub fn complete(&self) {
        lock(&self.inner).complete();
    }

    pub fn get_outcome(&self) -> ReportOutcome {
        lock(&self.outcome).clone()
    }
}

//------------------------------------------

struct PBInner {
    title: String,
    bar: ProgressBar,
}

impl PBInner {
    fn new(title: String) -> Self {
        let bar = ProgressBar::new(100);
        let mut inner = Self { title, bar };
        inner.set_style("");
        inner
    }

    fn set_style(&mut self, sub_title: &str) {
        let mut fmt = self.title.clone();
        fmt.push_str(" [{bar:40}] Remaining {eta}");
        if !sub_title.is_empty() {
            fmt.push_str(", ");
            fmt.push_str(sub_title);
        }

        // a template that doesn't parse leaves the previous style
        if let Ok(style) = ProgressStyle::default_bar().template(&fmt) {
            self.bar.set_style(style.progress_chars("=> "));
        }
    }
}

impl ReportInner for PBInner {
    fn set_sub_title(&mut self, txt: &str) {
        self.set_style(txt);
    }

    fn progress(&mut self, percent: u8) {
        self.bar.set_position(percent as u64);
        self.bar.tick();
    }

    fn log(&mut self, txt: &str) {
        self.bar.println(txt);
    }

    fn complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

pub fn mk_progress_bar_report() -> Report {
    Report::new(Box::new(PBInner::new("Listing thin devices".to_string())))
}

//------------------------------------------

struct SimpleInner {
    last_progress: Instant,
}

impl SimpleInner {
    fn new() -> SimpleInner {
        SimpleInner {
            last_progress: Instant::now(),
        }
    }
}

impl ReportInner for SimpleInner {
    fn set_sub_title(&mut self, txt: &str) {
        eprintln!("{}", txt);
    }

    fn progress(&mut self, percent: u8) {
        if self.last_progress.elapsed() > Duration::from_secs(5) {
            eprintln!("Progress: {}%", percent);
            self.last_progress = Instant::now();
        }
    }

    fn log(&mut self, txt: &str) {
        eprintln!("{}", txt);
    }

    fn complete(&mut self) {}
}

pub fn mk_simple_report() -> Report {
    Report::new(Box::new(SimpleInner::new()))
}

//------------------------------------------

struct QuietInner {}

impl ReportInner for QuietInner {
    fn set_sub_title(&mut self, _txt: &str) {}

    fn progress(&mut self, _percent: u8) {}

    fn log(&mut self, _txt: &str) {}

    fn complete(&mut self) {}
}

pub fn mk_quiet_report() -> Report {
    Report::new(Box::new(QuietInner {}))
}

//------------------------------------------


//------------------------------------------
