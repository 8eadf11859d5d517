use log::info;

use crate::backend::Elm;

/// Receives the score after every training iteration.
pub trait IterationListener {
    fn iteration_done(&mut self, iteration: usize, score: Elm);
}

impl<F: FnMut(usize, Elm)> IterationListener for F {
    fn iteration_done(&mut self, iteration: usize, score: Elm) {
        self(iteration, score)
    }
}

/// Logs the score every `print_every` iterations.
#[derive(Debug, Clone)]
pub struct ScoreIterationListener {
    print_every: usize,
}

impl ScoreIterationListener {
    pub fn new(print_every: usize) -> Self {
        Self {
            print_every: print_every.max(1),
        }
    }
}

impl IterationListener for ScoreIterationListener {
    fn iteration_done(&mut self, iteration: usize, score: Elm) {
        if iteration % self.print_every == 0 {
            info!("Score at iteration {} is {}", iteration, score);
        }
    }
}

/// Forwards each iteration to every wrapped listener, in order.
#[derive(Default)]
pub struct ComposableIterationListener {
    listeners: Vec<Box<dyn IterationListener>>,
}

impl ComposableIterationListener {
    pub fn new(listeners: Vec<Box<dyn IterationListener>>) -> Self {
        Self { listeners }
    }

    pub fn push(&mut self, listener: Box<dyn IterationListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl IterationListener for ComposableIterationListener {
    fn iteration_done(&mut self, iteration: usize, score: Elm) {
        for listener in &mut self.listeners {
            listener.iteration_done(iteration, score);
        }
    }
}
