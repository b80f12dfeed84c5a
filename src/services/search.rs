use nucleo_matcher::{
    pattern::{CaseMatching, Normalization, Pattern},
    Matcher,
};

use crate::data::CommentItem;

/// Filter comments using fuzzy matching over author and content.
/// Returns the indices of matching comments, in conversation order.
pub fn filter_comments(comments: &[CommentItem], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..comments.len()).collect();
    }

    let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
    let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);

    let haystacks: Vec<String> = comments
        .iter()
        .map(|c| format!("{} {}", c.author, c.content))
        .collect();

    let mut buf = Vec::new();
    haystacks
        .iter()
        .enumerate()
        .filter(|(_, haystack)| {
            let utf32 = nucleo_matcher::Utf32Str::new(haystack, &mut buf);
            pattern.score(utf32, &mut matcher).is_some()
        })
        .map(|(idx, _)| idx)
        .collect()
}
