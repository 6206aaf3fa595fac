// Helper utilities.
fn main() {}
