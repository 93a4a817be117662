#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use runegrid::{DrawingEngine, RunesResult};

/// Canvas that remembers how it was built.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Seed(&'static str),
    Recolor { id: u64, src: Canvas },
    Stack { count: u32, src: Canvas },
    BesideFrac { frac: f64, left: Canvas, right: Canvas },
    Beside { left: Canvas, right: Canvas },
}

pub type Canvas = Arc<Expr>;

pub fn seed(name: &'static str) -> Canvas {
    Arc::new(Expr::Seed(name))
}

pub fn stack(count: u32, src: &Canvas) -> Canvas {
    Arc::new(Expr::Stack {
        count,
        src: Arc::clone(src),
    })
}

pub fn beside_frac(frac: f64, left: &Canvas, right: &Canvas) -> Canvas {
    Arc::new(Expr::BesideFrac {
        frac,
        left: Arc::clone(left),
        right: Arc::clone(right),
    })
}

/// Expected `intermediate` after a grid stacker with `repeat` iterations ran alone over `base`.
pub fn expected_grid(repeat: u32, base: &Canvas) -> Canvas {
    let copies = repeat * 2;
    let mut acc = stack(copies, base);
    for step in 1..=repeat {
        acc = beside_frac(1.0 / f64::from(step), &stack(copies, base), &acc);
    }
    acc
}

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    RandomColor,
    StackN(u32),
    BesideFrac(f64),
    Beside,
    Show,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub thread: String,
    pub op: Op,
}

/// Engine that builds [`Expr`] trees and logs every call with the calling thread's name.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<Call>>,
    next_color: AtomicU64,
    /// Thread name and 1-based `random_color` call (from that thread) that panics.
    panic_in: Option<(String, u64)>,
    doomed_calls: AtomicU64,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panic inside the first `random_color` called from the thread named `thread`.
    pub fn panicking_in(thread: impl Into<String>) -> Self {
        Self::panicking_on_call(thread, 1)
    }

    /// Panic inside the `nth` `random_color` called from the thread named `thread`. Earlier calls
    /// from that thread behave normally.
    pub fn panicking_on_call(thread: impl Into<String>, nth: u64) -> Self {
        Self {
            panic_in: Some((thread.into(), nth)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_from(&self, thread: &str) -> Vec<Op> {
        self.calls()
            .into_iter()
            .filter(|c| c.thread == thread)
            .map(|c| c.op)
            .collect()
    }

    fn record(&self, op: Op) {
        let thread = std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();
        self.calls.lock().unwrap().push(Call { thread, op });
    }
}

impl DrawingEngine for RecordingEngine {
    type Canvas = Canvas;

    fn random_color(&self, canvas: &Canvas) -> Canvas {
        if let Some((name, nth)) = &self.panic_in {
            if std::thread::current().name() == Some(name.as_str())
                && self.doomed_calls.fetch_add(1, Ordering::SeqCst) + 1 == *nth
            {
                panic!("recolor blew up in {name}");
            }
        }
        self.record(Op::RandomColor);
        let id = self.next_color.fetch_add(1, Ordering::SeqCst);
        Arc::new(Expr::Recolor {
            id,
            src: Arc::clone(canvas),
        })
    }

    fn stack_n(&self, count: u32, canvas: &Canvas) -> Canvas {
        self.record(Op::StackN(count));
        stack(count, canvas)
    }

    fn beside_frac(&self, frac: f64, left: &Canvas, right: &Canvas) -> Canvas {
        self.record(Op::BesideFrac(frac));
        beside_frac(frac, left, right)
    }

    fn beside(&self, left: &Canvas, right: &Canvas) -> Canvas {
        self.record(Op::Beside);
        Arc::new(Expr::Beside {
            left: Arc::clone(left),
            right: Arc::clone(right),
        })
    }

    fn show(&self, _canvas: &Canvas) -> RunesResult<()> {
        self.record(Op::Show);
        Ok(())
    }
}

/// Number of times consecutive calls switch from one thread to another.
pub fn thread_switches(calls: &[Call]) -> usize {
    calls
        .windows(2)
        .filter(|w| w[0].thread != w[1].thread)
        .count()
}
