/// Length of a national-ID number.
pub const TC_NO_LEN: usize = 11;

/// Shape check only: 11 ASCII digits, first digit non-zero.
pub fn has_valid_format(tc_no: &str) -> bool {
    tc_no.len() == TC_NO_LEN
        && tc_no.bytes().all(|b| b.is_ascii_digit())
        && !tc_no.starts_with('0')
}

/// Full offline check: format plus both check digits.
///
/// The 10th digit is `(7 * (d1 + d3 + d5 + d7 + d9) - (d2 + d4 + d6 + d8)) mod 10`
/// and the 11th is the sum of the first ten digits mod 10.
pub fn is_valid(tc_no: &str) -> bool {
    if !has_valid_format(tc_no) {
        return false;
    }

    let digits: Vec<i32> = tc_no.bytes().map(|b| i32::from(b - b'0')).collect();

    let odd_sum: i32 = digits[0..9].iter().step_by(2).sum();
    let even_sum: i32 = digits[1..8].iter().step_by(2).sum();
    let tenth = (odd_sum * 7 - even_sum).rem_euclid(10);
    if tenth != digits[9] {
        return false;
    }

    digits[..10].iter().sum::<i32>() % 10 == digits[10]
}
