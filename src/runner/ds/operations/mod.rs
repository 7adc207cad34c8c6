pub mod object;
pub mod test_and_comparison;
pub mod type_conversion;
