//! Spoken-word rendering of integers.
//!
//! Numbers are read the way people say them out loud rather than the way a
//! cheque is written: 101 is "one oh one", 125 is "one twenty five" and 1101
//! is "one thousand one oh one".

const ONES: [&str; 20] = [
    "", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Convert `num` into its pronunciation.
///
/// Total over every `u32`; values of one million and above fall back to their
/// decimal digits.
pub fn number_to_words(num: u32) -> String {
    match num {
        0 => "zero".to_string(),
        1..=19 => ONES[num as usize].to_string(),
        20..=99 => below_hundred(num),
        100..=999 => hundreds(num),
        1_000..=999_999 => {
            let mut words = format!("{} thousand", number_to_words(num / 1_000));
            let remainder = num % 1_000;
            if remainder != 0 {
                words.push(' ');
                words.push_str(&number_to_words(remainder));
            }
            words
        }
        _ => num.to_string(),
    }
}

fn below_hundred(num: u32) -> String {
    let tens = TENS[(num / 10) as usize];
    match num % 10 {
        0 => tens.to_string(),
        unit => format!("{tens} {}", ONES[unit as usize]),
    }
}

fn hundreds(num: u32) -> String {
    let leading = ONES[(num / 100) as usize];
    match num % 100 {
        0 => format!("{leading} hundred"),
        remainder @ 1..=9 => format!("{leading} oh {}", ONES[remainder as usize]),
        remainder => format!("{leading} {}", number_to_words(remainder)),
    }
}
