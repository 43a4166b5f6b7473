pub const DEFAULT_REFUSAL_MARKERS: &[&str] = &[
    "죄송하지만",
    "죄송합니다",
    "I cannot",
    "I'm unable",
    "I apologize",
    "cannot process",
    "unable to",
    "inappropriate",
    "포함되어 있지 않",
    "추가적인 정보",
    "추출할 수 없",
    "분석할 수 없",
    "요약할 수 없",
    "도움을 드릴 수 없",
    "content policy",
    "safety guidelines",
];

/// Substring heuristic for model non-answers.
///
/// Any marker anywhere in the reply marks it as a refusal, so a genuine summary
/// that quotes an apology is rejected and a polite refusal worded differently
/// slips through. Both are known limits of the marker list.
#[derive(Debug, Clone)]
pub struct RefusalClassifier {
    markers: Vec<String>,
    min_chars: usize,
}

impl RefusalClassifier {
    pub fn new<I, S>(markers: I, min_chars: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|marker| marker.as_ref().to_lowercase())
                .filter(|marker| !marker.is_empty())
                .collect(),
            min_chars,
        }
    }

    pub fn with_default_markers(min_chars: usize) -> Self {
        Self::new(DEFAULT_REFUSAL_MARKERS.iter().copied(), min_chars)
    }

    pub fn is_refusal(&self, candidate: &str) -> bool {
        let lowered = candidate.to_lowercase();
        self.markers
            .iter()
            .any(|marker| lowered.contains(marker.as_str()))
    }

    /// Usable means no refusal marker and strictly longer than the floor.
    pub fn is_usable(&self, candidate: &str) -> bool {
        candidate.chars().count() > self.min_chars && !self.is_refusal(candidate)
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }
}
