use crate::Preset;
use crate::preset_fn;

/// Always generates nothing. Handy for clearing a block or as a
/// placeholder.
pub fn empty_preset() -> impl Preset {
	preset_fn(|_ctx| Ok(String::new()))
}
