pub mod feature_normalizer;
