use rand::Rng;

/// Generate an attribute vector where every area carries the same value.
pub fn gen_uniform_attrs(num_of_areas: usize) -> Vec<i64> {
    vec![1; num_of_areas]
}

/// Generate an attribute vector with uniformly random values in
/// `[min_value, max_value]`.
pub fn gen_random_attrs(num_of_areas: usize, min_value: i64, max_value: i64) -> Vec<i64> {
    if max_value < min_value {
        panic!("max value must be greater than min value.");
    }

    let mut rng = rand::thread_rng();

    (0..num_of_areas)
        .map(|_| rng.gen_range(min_value..=max_value))
        .collect()
}
