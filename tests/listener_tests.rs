use std::cell::RefCell;
use std::rc::Rc;

use boltzmann::backend::Backend;
use boltzmann::backend::ndarray::NdArray;
use boltzmann::engine::config::ConfigurationBuilder;
use boltzmann::engine::layer::rbm::Rbm;
use boltzmann::engine::listener::{
    ComposableIterationListener, IterationListener, ScoreIterationListener,
};

#[test]
fn test_closure_listener() {
    let mut seen = Vec::new();
    {
        let mut listener = |i: usize, s: f32| seen.push((i, s));
        listener.iteration_done(0, 1.5);
        listener.iteration_done(1, 0.5);
    }
    assert_eq!(seen, vec![(0, 1.5), (1, 0.5)]);
}

#[test]
fn test_composable_listener_fans_out() {
    let a = Rc::new(RefCell::new(Vec::new()));
    let b = Rc::new(RefCell::new(0usize));

    let a2 = Rc::clone(&a);
    let b2 = Rc::clone(&b);
    let mut composite = ComposableIterationListener::new(vec![
        Box::new(ScoreIterationListener::new(5)),
        Box::new(move |i: usize, _: f32| a2.borrow_mut().push(i)),
    ]);
    composite.push(Box::new(move |_: usize, _: f32| *b2.borrow_mut() += 1));
    assert_eq!(composite.len(), 3);

    let input = NdArray::from_vec(vec![1.0, 0.0, 1.0, 0.0, 1.0, 1.0], &[2, 3]).unwrap();
    let conf = ConfigurationBuilder {
        n_in: 3,
        n_out: 2,
        iterations: 4,
        ..Default::default()
    }
    .build()
    .unwrap();
    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    rbm.fit_with(&input, &mut composite).unwrap();

    assert_eq!(*a.borrow(), vec![0, 1, 2, 3]);
    assert_eq!(*b.borrow(), 4);
}
