/// Tri-color marking state for a heap slot (§3, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcColor {
    White,
    Gray,
    Black,
}
