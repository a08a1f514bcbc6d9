//! Substring filters over rendered traceback text
//!
//! Two independent passes: [`blocks`] drops coarse multi-line units (a whole
//! frame), [`lines`] drops single lines. Both only delete, never reorder.

use crate::exclusion::ExclusionList;

/// Keep the blocks that contain none of the markers in `excluded`
pub fn blocks<'a, I, S>(blocks: I, excluded: &'a ExclusionList) -> impl Iterator<Item = S> + 'a
where
    I: IntoIterator<Item = S> + 'a,
    I::IntoIter: 'a,
    S: AsRef<str> + 'a,
{
    blocks
        .into_iter()
        .filter(move |block| !excluded.matches(block.as_ref()))
}

/// Split `text` into lines and keep those that contain none of the markers
pub fn lines<'a>(text: &'a str, excluded: &'a ExclusionList) -> impl Iterator<Item = &'a str> + 'a {
    text.lines().filter(move |line| !excluded.matches(line))
}
