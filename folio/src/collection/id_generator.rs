use crate::common::current_millis;
use rand::Rng;

const RADIX: u32 = 36;
const RANDOM_SUFFIX_LEN: usize = 9;

/// Generates document ids: the current epoch milliseconds in base 36
/// followed by nine random base-36 characters.
///
/// Uniqueness is best effort. Two ids generated in the same millisecond
/// collide only if their random suffixes do, and an insert that hits an
/// existing id fails with `AlreadyExists` instead of overwriting.
pub struct IdGenerator;

impl IdGenerator {
    pub fn next_id() -> String {
        let millis = current_millis();
        let mut id = to_base36(millis);

        let mut rng = rand::thread_rng();
        for _ in 0..RANDOM_SUFFIX_LEN {
            let digit = rng.gen_range(0..RADIX);
            if let Some(c) = std::char::from_digit(digit, RADIX) {
                id.push(c);
            }
        }
        id
    }
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % RADIX as u128) as u32;
        if let Some(c) = std::char::from_digit(digit, RADIX) {
            digits.push(c);
        }
        value /= RADIX as u128;
    }
    digits.iter().rev().collect()
}
