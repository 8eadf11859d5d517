use boltzmann::Error;
use boltzmann::backend::Backend;
use boltzmann::backend::ndarray::NdArray;
use boltzmann::engine::config::{Configuration, ConfigurationBuilder};
use boltzmann::engine::gradient::{HIDDEN_BIAS_KEY, VISIBLE_BIAS_KEY, WEIGHT_KEY};
use boltzmann::engine::layer::rbm::Rbm;
use boltzmann::engine::layer::units::Unit;
use boltzmann::engine::layer::weight_init::{Distribution, WeightInit};
use boltzmann::engine::layer::{Layer, LayerState};
use boltzmann::engine::loss::LossFunction;
use rand::{SeedableRng, rngs::StdRng};

type Tensor = <NdArray as Backend>::Tensor;

fn binary_data() -> Tensor {
    NdArray::from_vec(
        vec![
            1.0, 1.0, 1.0, 0.0, 0.0, 0.0, //
            1.0, 0.0, 1.0, 0.0, 0.0, 0.0, //
            1.0, 1.0, 1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 1.0, 0.0,
        ],
        &[7, 6],
    )
    .unwrap()
}

fn basic_conf() -> Configuration {
    ConfigurationBuilder {
        n_in: 6,
        n_out: 4,
        learning_rate: 1e-1,
        loss_function: LossFunction::RmseXent,
        ..Default::default()
    }
    .build()
    .unwrap()
}

// 平均0・分散1程度の連続値データ(正規化済みの入力を想定)
fn gaussian_data(rows: usize, cols: usize, seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    NdArray::random_normal(&[rows, cols], 0.0, 1.0, &mut rng).unwrap()
}

#[test]
fn test_basic() {
    let input = binary_data();
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    rbm.fit(&input).unwrap();

    let grad = rbm.gradient().unwrap();
    assert_eq!(NdArray::len(grad.gradient_for(WEIGHT_KEY).unwrap()), 24);
    assert_eq!(NdArray::shape(grad.get(WEIGHT_KEY).unwrap()), vec![6, 4]);
    assert_eq!(NdArray::shape(grad.get(VISIBLE_BIAS_KEY).unwrap()), vec![6]);
    assert_eq!(NdArray::shape(grad.get(HIDDEN_BIAS_KEY).unwrap()), vec![4]);
    assert_eq!(rbm.state(), LayerState::Fitted);
}

#[test]
fn test_num_params() {
    let rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    assert_eq!(rbm.num_params(), 6 * 4 + 6 + 4);
    assert_eq!(rbm.num_params(), 34);
    assert_eq!(NdArray::len(&rbm.params()), 34);
    assert_eq!(rbm.state(), LayerState::Configured);
}

#[test]
fn test_set_get_params() {
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let rand2 = NdArray::random_uniform(&[1, rbm.num_params()], 0.0, 1.0, &mut rng).unwrap();

    rbm.set_params(&rand2).unwrap();
    let get_params = rbm.params();
    assert_eq!(NdArray::to_vec(&rand2), NdArray::to_vec(&get_params));
}

#[test]
fn test_set_params_layout() {
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    let v: Vec<f32> = (0..34).map(|i| i as f32).collect();
    rbm.set_params(&NdArray::from_vec_1d(v.clone())).unwrap();

    // W(行優先) -> vb -> hb
    assert_eq!(NdArray::to_vec(rbm.weights()), v[..24].to_vec());
    assert_eq!(NdArray::to_vec(rbm.visible_bias()), v[24..30].to_vec());
    assert_eq!(NdArray::to_vec(rbm.hidden_bias()), v[30..].to_vec());
    assert_eq!(NdArray::to_vec(rbm.weights())[4], 4.0);
}

#[test]
fn test_set_params_wrong_length() {
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    let before = NdArray::to_vec(&rbm.params());

    let res = rbm.set_params(&NdArray::zeros(&[33]));
    assert!(matches!(
        res,
        Err(Error::DimensionMismatch {
            expected: 34,
            actual: 33
        })
    ));
    assert_eq!(NdArray::to_vec(&rbm.params()), before);
}

#[test]
fn test_cg() {
    let input = binary_data();
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    rbm.set_input(&input).unwrap();
    let value = rbm.score().unwrap();
    assert!(value.is_finite());

    let params_before = NdArray::to_vec(&rbm.params());
    rbm.contrastive_divergence().unwrap();
    // contrastive divergence does not touch the parameters
    assert_eq!(NdArray::to_vec(&rbm.params()), params_before);
    assert_eq!(rbm.score().unwrap(), value);

    let grad = rbm.gradient().unwrap();
    assert_eq!(NdArray::len(grad.get(WEIGHT_KEY).unwrap()), 24);
}

#[test]
fn test_gradient() {
    let input = binary_data();
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    rbm.set_input(&input).unwrap();
    let value = rbm.score().unwrap();
    assert!(value.is_finite());

    // no divergence step yet
    assert!(matches!(rbm.gradient(), Err(Error::IllegalState(_))));

    rbm.fit(&input).unwrap();
    assert!(rbm.gradient().is_ok());
}

#[test]
fn test_cd_gradient_values_when_saturated() {
    // 全パラメータ50ならサンプリングは常に1になり、勾配は決定的
    let conf = ConfigurationBuilder {
        n_in: 2,
        n_out: 1,
        ..Default::default()
    }
    .build()
    .unwrap();
    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    rbm.set_params(&NdArray::from_vec(vec![50.0; 5], &[5]).unwrap())
        .unwrap();

    let input = NdArray::from_vec(vec![1.0, 0.0, 1.0, 0.0], &[2, 2]).unwrap();
    rbm.set_input(&input).unwrap();
    rbm.contrastive_divergence().unwrap();
    let gradient = rbm.gradient().unwrap();

    let close = |key: &str, expected: &[f32]| {
        let got = NdArray::to_vec(gradient.get(key).unwrap());
        assert_eq!(got.len(), expected.len(), "{key}");
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() < 1e-6, "{key}: {got:?} != {expected:?}");
        }
    };
    // (negative - positive) / batch
    close(WEIGHT_KEY, &[0.0, 1.0]);
    close(VISIBLE_BIAS_KEY, &[0.0, 1.0]);
    close(HIDDEN_BIAS_KEY, &[0.0]);

    // CDは勾配を作るだけでパラメータは変えない
    assert_eq!(NdArray::to_vec(&rbm.params()), vec![50.0; 5]);
}

#[test]
fn test_score_is_idempotent() {
    let input = binary_data();
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    rbm.fit(&input).unwrap();

    let a = rbm.score().unwrap();
    let b = rbm.score().unwrap();
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn test_set_input_wrong_columns() {
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    let before = NdArray::to_vec(&rbm.params());

    let bad = NdArray::zeros(&[7, 5]);
    assert!(matches!(rbm.set_input(&bad), Err(Error::InvalidShape(_))));
    assert!(matches!(rbm.fit(&bad), Err(Error::InvalidShape(_))));
    assert!(rbm.input().is_none());
    assert_eq!(NdArray::to_vec(&rbm.params()), before);

    let flat = NdArray::zeros(&[6]);
    assert!(matches!(rbm.set_input(&flat), Err(Error::InvalidShape(_))));
}

#[test]
fn test_fit_is_deterministic() {
    let input = binary_data();
    let conf = ConfigurationBuilder {
        iterations: 20,
        ..basic_conf_builder()
    }
    .build()
    .unwrap();

    let run = |conf: Configuration| {
        let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
        let mut scores = Vec::new();
        rbm.fit_with(&input, &mut |_: usize, s: f32| scores.push(s.to_bits()))
            .unwrap();
        (scores, NdArray::to_vec(&rbm.params()))
    };

    let (scores_a, params_a) = run(conf.clone());
    let (scores_b, params_b) = run(conf);
    assert_eq!(scores_a.len(), 20);
    assert_eq!(scores_a, scores_b);
    assert_eq!(params_a, params_b);
}

fn basic_conf_builder() -> ConfigurationBuilder {
    ConfigurationBuilder {
        n_in: 6,
        n_out: 4,
        learning_rate: 1e-1,
        loss_function: LossFunction::RmseXent,
        ..Default::default()
    }
}

#[test]
fn test_listener_sees_post_update_score() {
    let input = binary_data();
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    let mut last = None;
    rbm.fit_with(&input, &mut |i: usize, s: f32| last = Some((i, s)))
        .unwrap();

    let (iteration, score) = last.unwrap();
    assert_eq!(iteration, rbm.conf().iterations() - 1);
    assert_eq!(score, rbm.score().unwrap());
}

#[test]
fn test_fit_reduces_reconstruction_error() {
    let input = binary_data();
    let conf = ConfigurationBuilder {
        iterations: 300,
        loss_function: LossFunction::ReconstructionCrossEntropy,
        ..basic_conf_builder()
    }
    .build()
    .unwrap();
    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    rbm.set_input(&input).unwrap();
    let initial = rbm.score().unwrap();

    rbm.fit(&input).unwrap();
    let fitted = rbm.score().unwrap();
    assert!(
        fitted < initial,
        "score did not decrease: {} -> {}",
        initial,
        fitted
    );
}

#[test]
fn test_cd_k_steps() {
    let input = binary_data();
    let conf = ConfigurationBuilder {
        k: 3,
        ..basic_conf_builder()
    }
    .build()
    .unwrap();
    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    rbm.fit(&input).unwrap();
    assert!(rbm.gradient().unwrap().all_finite());
}

#[test]
fn test_gaussian_visible_rectified_hidden() {
    let input = gaussian_data(30, 4, 5);
    let conf = ConfigurationBuilder {
        n_in: 4,
        n_out: 3,
        learning_rate: 1e-1,
        loss_function: LossFunction::RmseXent,
        visible_unit: Unit::Gaussian,
        hidden_unit: Unit::Rectified,
        ..Default::default()
    }
    .build()
    .unwrap();
    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    rbm.fit(&input).unwrap();

    let hidden = rbm.transform(&input).unwrap();
    assert_eq!(NdArray::shape(&hidden), vec![30, 3]);
    assert!(NdArray::to_vec(&hidden).iter().all(|&h| h >= 0.0));
    assert!(rbm.score().unwrap().is_finite());
}

#[test]
fn test_gaussian_visible_gaussian_hidden() {
    let input = gaussian_data(30, 4, 6);
    let conf = ConfigurationBuilder {
        n_in: 4,
        n_out: 3,
        learning_rate: 1e-1,
        loss_function: LossFunction::RmseXent,
        visible_unit: Unit::Gaussian,
        hidden_unit: Unit::Gaussian,
        ..Default::default()
    }
    .build()
    .unwrap();
    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    rbm.fit(&input).unwrap();
    assert_eq!(NdArray::len(rbm.gradient().unwrap().get(WEIGHT_KEY).unwrap()), 12);
}

#[test]
fn test_rectified_hidden_with_variance_scaled_init() {
    let input = gaussian_data(10, 16, 7);
    let conf = ConfigurationBuilder {
        n_in: 16,
        n_out: 20,
        learning_rate: 1e-3,
        loss_function: LossFunction::RmseXent,
        visible_unit: Unit::Gaussian,
        hidden_unit: Unit::Rectified,
        weight_init: WeightInit::VarianceScaled,
        ..Default::default()
    }
    .build()
    .unwrap();
    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    rbm.fit(&input).unwrap();
    assert!(rbm.score().unwrap().is_finite());
}

#[test]
fn test_distribution_init_unit_norm_with_stability() {
    let mut rng = StdRng::seed_from_u64(11);
    let probs = NdArray::scale(&NdArray::ones(&[10, 64]), 0.3);
    let input = NdArray::bernoulli(&probs, &mut rng);
    let conf = ConfigurationBuilder {
        n_in: 64,
        n_out: 32,
        iterations: 30,
        learning_rate: 1e-1,
        constrain_gradient_to_unit_norm: true,
        enforce_numerical_stability: true,
        weight_init: WeightInit::Distribution(Distribution::Normal {
            mean: 1.0,
            std: 1e-5,
        }),
        loss_function: LossFunction::ReconstructionCrossEntropy,
        ..Default::default()
    }
    .build()
    .unwrap();

    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    let w = NdArray::to_vec(rbm.weights());
    assert!(w.iter().all(|&v| (v - 1.0).abs() < 1e-3));

    rbm.fit(&input).unwrap();
    assert!(rbm.gradient().unwrap().all_finite());
    assert!(rbm.score().unwrap().is_finite());
}

#[test]
fn test_non_finite_input_with_stability_enforced() {
    let mut data = NdArray::to_vec(&binary_data());
    data[0] = f32::NAN;
    let input = NdArray::from_vec(data, &[7, 6]).unwrap();

    let conf = ConfigurationBuilder {
        enforce_numerical_stability: true,
        ..basic_conf_builder()
    }
    .build()
    .unwrap();
    let mut rbm = Rbm::<NdArray>::new(conf).unwrap();
    let before = NdArray::to_vec(&rbm.params());
    assert!(matches!(
        rbm.fit(&input),
        Err(Error::NumericalInstability(_))
    ));
    // 勾配チェックで止まるのでパラメータは変わらない
    assert_eq!(NdArray::to_vec(&rbm.params()), before);
    assert_eq!(rbm.state(), LayerState::Configured);
}

#[test]
fn test_non_finite_input_without_enforcement_propagates() {
    let mut data = NdArray::to_vec(&binary_data());
    data[0] = f32::NAN;
    let input = NdArray::from_vec(data, &[7, 6]).unwrap();

    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    rbm.fit(&input).unwrap();
    assert!(NdArray::to_vec(&rbm.params()).iter().any(|v| v.is_nan()));
}

#[test]
fn test_reconstruct_shape() {
    let input = binary_data();
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    rbm.fit(&input).unwrap();

    let recon = rbm.reconstruct(&input).unwrap();
    assert_eq!(NdArray::shape(&recon), vec![7, 6]);
    assert!(NdArray::to_vec(&recon).iter().all(|&v| (0.0..=1.0).contains(&v)));

    let energy = rbm.free_energy(&input).unwrap();
    assert_eq!(NdArray::shape(&energy), vec![7]);
}

#[test]
fn test_gibbs_sampling_shapes() {
    let input = binary_data();
    let mut rbm = Rbm::<NdArray>::new(basic_conf()).unwrap();
    let h = rbm.sample_hidden_given_visible(&input).unwrap();
    assert_eq!(NdArray::shape(&h.sample), vec![7, 4]);

    let (v, h2) = rbm.gibbs_hvh(&h.sample).unwrap();
    assert_eq!(NdArray::shape(&v.mean), vec![7, 6]);
    assert_eq!(NdArray::shape(&h2.mean), vec![7, 4]);
    assert!(NdArray::to_vec(&v.sample).iter().all(|&x| x == 0.0 || x == 1.0));

    let v2 = rbm.sample_visible_given_hidden(&h2.sample).unwrap();
    assert_eq!(NdArray::shape(&v2.sample), vec![7, 6]);
}
