use std::fmt;

const BYTE_UNITS: &[&str] = &["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Displays a number of bytes with the largest SI unit that keeps the value above 1.
pub struct DisplayBytes(u64);

impl DisplayBytes {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for DisplayBytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = self.0 as f64;

        match BYTE_UNITS
            .iter()
            .enumerate()
            .map(|(i, u)| (value / 1000_f64.powi(i as i32 + 1), u))
            .take_while(|(x, _)| *x > 1.0)
            .last()
        {
            Some((x, unit)) => write!(f, "{:.2} {}", x, unit),
            None => write!(f, "{} B", self.0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn units() {
        assert_eq!(DisplayBytes::new(600).to_string(), "600 B");
        assert_eq!(DisplayBytes::new(34_816).to_string(), "34.82 kB");
        assert_eq!(DisplayBytes::new(2_500_000).to_string(), "2.50 MB");
    }
}
