//! Context-window role classification of normalized amounts.
//!
//! Each value is traced back to the token it came from, located in the raw
//! text with a boundary-safe search, and labeled from the keywords around
//! it. An optional [`LabelService`] can override the heuristic per value;
//! when it is missing, slow or wrong the heuristic result stands.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::confidence::{mean_confidence, round_confidence};
use super::normalizer::parse_amount;
use super::rules::{extract_explicit_amounts, find_number_token, match_role, window_around, window_before};
use crate::error::LabelError;
use crate::labels::{LabelMap, LabelService};
use crate::models::stage::{ClassifyOutput, StageOutcome};
use crate::models::{format_value, AmountType, ClassifiedAmount, TallyConfig};

/// Source recorded for amounts recovered by the explicit-label fallback.
pub const EXPLICIT_SOURCE: &str = "text: 'explicit labeled'";

/// Tunables for the classifier, taken from [`TallyConfig`].
#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    pub context_before_chars: usize,
    pub context_window_chars: usize,
    pub snippet_window_chars: usize,
    pub explicit_label_fallback: bool,
    /// External labels beat the context heuristic when true.
    pub prefer_external: bool,
    pub label_timeout: Duration,
}

impl ClassifierOptions {
    pub fn from_config(config: &TallyConfig) -> Self {
        Self {
            context_before_chars: config.extraction.context_before_chars,
            context_window_chars: config.extraction.context_window_chars,
            snippet_window_chars: config.extraction.snippet_window_chars,
            explicit_label_fallback: config.extraction.explicit_label_fallback,
            prefer_external: config.labeling.prefer_external,
            label_timeout: config.labeling.timeout(),
        }
    }
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self::from_config(&TallyConfig::default())
    }
}

/// Assigns roles to amounts from the text around them.
#[derive(Clone, Default)]
pub struct ContextClassifier {
    options: ClassifierOptions,
    label_service: Option<Arc<dyn LabelService>>,
}

impl ContextClassifier {
    pub fn new(options: ClassifierOptions) -> Self {
        Self {
            options,
            label_service: None,
        }
    }

    pub fn with_label_service(mut self, service: Arc<dyn LabelService>) -> Self {
        self.label_service = Some(service);
        self
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    /// Label a single token from its surroundings in `raw_text`.
    ///
    /// The left window is tried before the symmetric one. A token that
    /// cannot be located is judged against the whole text.
    pub fn classify_by_context(&self, token: &str, raw_text: &str) -> AmountType {
        if token.is_empty() || raw_text.is_empty() {
            return AmountType::Unknown;
        }

        let text = raw_text.to_lowercase();
        let token = token.to_lowercase();

        let (before, around) = match find_number_token(&text, &token) {
            Some(idx) => (
                window_before(&text, idx, self.options.context_before_chars),
                window_around(&text, idx, token.len(), self.options.context_window_chars),
            ),
            None => (text.as_str(), text.as_str()),
        };

        match_role(before)
            .or_else(|| match_role(around))
            .unwrap_or(AmountType::Unknown)
    }

    /// Classify values with an already-fetched label map, if any.
    pub fn classify_with_labels(
        &self,
        values: &[f64],
        raw_text: &str,
        tokens: &[String],
        labels: Option<&LabelMap>,
    ) -> StageOutcome<ClassifyOutput> {
        if values.is_empty() {
            return StageOutcome::halted("no normalized amounts");
        }

        let mut amounts = Vec::with_capacity(values.len());
        let mut weights = Vec::with_capacity(values.len());

        for &value in values {
            let token = originating_token(value, tokens);
            let heuristic = self.classify_by_context(&token, raw_text);
            let external = labels.and_then(|map| map.get(value));
            let label = self.resolve_label(heuristic, external);

            debug!("Classified {} (token {:?}) as {}", value, token, label.as_str());

            weights.push(label.confidence_weight());
            amounts.push(ClassifiedAmount::new(
                label,
                value,
                self.source_snippet(raw_text, &token),
            ));
        }

        let confidence = round_confidence(mean_confidence(&weights));

        let has_required = amounts
            .iter()
            .any(|a| a.amount_type.required_role().is_some());
        if !has_required && self.options.explicit_label_fallback {
            merge_explicit_amounts(&mut amounts, raw_text);
        }

        StageOutcome::Completed(ClassifyOutput { amounts, confidence })
    }

    /// Ask the label service, if configured, for labels of `values`.
    ///
    /// Every failure mode yields `None`.
    pub async fn request_labels(&self, raw_text: &str, values: &[f64]) -> Option<LabelMap> {
        let service = self.label_service.as_ref()?;
        if values.is_empty() || raw_text.trim().is_empty() {
            return None;
        }

        let call = service.label_values(raw_text, values);
        match tokio::time::timeout(self.options.label_timeout, call).await {
            Ok(Ok(labels)) => {
                debug!("Label service {} labeled {} values", service.name(), labels.len());
                Some(labels)
            }
            Ok(Err(e)) => {
                warn!("Label service {} failed, using context heuristic: {}", service.name(), e);
                None
            }
            Err(_) => {
                let e = LabelError::Timeout(self.options.label_timeout);
                warn!("Label service {} failed, using context heuristic: {}", service.name(), e);
                None
            }
        }
    }

    /// Classify values, consulting the label service when one is set.
    pub async fn classify(
        &self,
        values: &[f64],
        raw_text: &str,
        tokens: &[String],
    ) -> StageOutcome<ClassifyOutput> {
        if values.is_empty() {
            return StageOutcome::halted("no normalized amounts");
        }

        let labels = self.request_labels(raw_text, values).await;
        let outcome = self.classify_with_labels(values, raw_text, tokens, labels.as_ref());

        if let Some(output) = outcome.output() {
            info!(
                "Classified {} amounts (confidence {:.2})",
                output.amounts.len(),
                output.confidence
            );
        }
        outcome
    }

    fn resolve_label(&self, heuristic: AmountType, external: Option<AmountType>) -> AmountType {
        match external {
            Some(label) if self.options.prefer_external => label,
            Some(label) if heuristic == AmountType::Unknown => label,
            _ => heuristic,
        }
    }

    /// `text: '<excerpt>'` around the token, quotes escaped.
    fn source_snippet(&self, raw_text: &str, token: &str) -> String {
        let excerpt = find_number_token(raw_text, token)
            .or_else(|| raw_text.find(token).filter(|_| !token.is_empty()))
            .map(|idx| window_around(raw_text, idx, token.len(), self.options.snippet_window_chars))
            .unwrap_or(raw_text);

        format!("text: '{}'", excerpt.replace('\'', "\\'"))
    }
}

impl std::fmt::Debug for ContextClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextClassifier")
            .field("options", &self.options)
            .field(
                "label_service",
                &self.label_service.as_ref().map(|s| s.name().to_string()),
            )
            .finish()
    }
}

/// The first token that normalizes to exactly `value`, or the value itself.
fn originating_token(value: f64, tokens: &[String]) -> String {
    tokens
        .iter()
        .find(|t| parse_amount(t) == Some(value))
        .cloned()
        .unwrap_or_else(|| format_value(value))
}

/// Append explicitly labeled amounts whose value was not already classified.
///
/// Only the classified values are checked, so two explicit labels sharing a
/// value (a fully paid bill) both survive.
fn merge_explicit_amounts(amounts: &mut Vec<ClassifiedAmount>, raw_text: &str) {
    let explicit = extract_explicit_amounts(raw_text);
    if explicit.is_empty() {
        return;
    }

    let seen: Vec<f64> = amounts.iter().map(|a| a.value).collect();
    let mut merged = 0;
    for found in explicit {
        let value = found.value();
        if seen.contains(&value) {
            continue;
        }
        debug!("Explicit {} {} from {:?}", found.role.canonical_label(), value, found.found.source);
        amounts.push(ClassifiedAmount::new(found.role.into(), value, EXPLICIT_SOURCE));
        merged += 1;
    }

    if merged > 0 {
        info!("Explicit label fallback added {} amounts", merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabelError;
    use crate::labels::StaticLabelService;
    use crate::extraction::Finalizer;
    use crate::models::{CurrencyHint, RequiredRole};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn types(output: &ClassifyOutput) -> Vec<(AmountType, f64)> {
        output.amounts.iter().map(|a| (a.amount_type, a.value)).collect()
    }

    #[test]
    fn test_classify_by_context_precedence() {
        let classifier = ContextClassifier::default();
        let text = "Grand Total: Rs. 1,500\nPaid: Rs. 1,000\nBalance Due: Rs. 500";
        assert_eq!(classifier.classify_by_context("Rs. 1,500", text), AmountType::TotalBill);
        assert_eq!(classifier.classify_by_context("Rs. 1,000", text), AmountType::Paid);
        assert_eq!(classifier.classify_by_context("Rs. 500", text), AmountType::Due);
    }

    #[test]
    fn test_left_window_wins_over_symmetric() {
        let classifier = ContextClassifier::default();
        // "paid" sits to the right of 120 and would win in the symmetric window
        assert_eq!(
            classifier.classify_by_context("120", "Total 120 paid"),
            AmountType::TotalBill
        );
    }

    #[test]
    fn test_symmetric_window_used_when_left_is_silent() {
        let classifier = ContextClassifier::default();
        assert_eq!(
            classifier.classify_by_context("75", "75 tax included"),
            AmountType::Tax
        );
    }

    #[test]
    fn test_unlocated_token_uses_whole_text() {
        let classifier = ContextClassifier::default();
        assert_eq!(
            classifier.classify_by_context("999", "remaining balance to settle"),
            AmountType::Due
        );
        assert_eq!(classifier.classify_by_context("999", "thank you"), AmountType::Unknown);
    }

    #[test]
    fn test_total_dollar_amount() {
        let classifier = ContextClassifier::default();
        let outcome = classifier.classify_with_labels(
            &[120.5],
            "Total: $120.50",
            &tokens(&["$120.50"]),
            None,
        );
        let output = outcome.output().unwrap();
        assert_eq!(types(output), vec![(AmountType::TotalBill, 120.5)]);
        assert_eq!(output.amounts[0].source, "text: 'Total: $120.50'");
        assert_eq!(output.confidence, 0.9);
    }

    #[test]
    fn test_confidence_is_rounded_mean() {
        let classifier = ContextClassifier::default();
        let text = "Grand Total: Rs. 1,500\nPaid: Rs. 1,000\nBalance Due: Rs. 500";
        let outcome = classifier.classify_with_labels(
            &[1500.0, 1000.0, 500.0],
            text,
            &tokens(&["Rs. 1,500", "Rs. 1,000", "Rs. 500"]),
            None,
        );
        let output = outcome.output().unwrap();
        assert_eq!(
            types(output),
            vec![
                (AmountType::TotalBill, 1500.0),
                (AmountType::Paid, 1000.0),
                (AmountType::Due, 500.0),
            ]
        );
        assert_eq!(output.confidence, 0.88);
    }

    #[test]
    fn test_snippet_escapes_quotes() {
        let classifier = ContextClassifier::default();
        let outcome =
            classifier.classify_with_labels(&[42.0], "Today's total 42", &tokens(&["42"]), None);
        assert_eq!(
            outcome.output().unwrap().amounts[0].source,
            r"text: 'Today\'s total 42'"
        );
    }

    #[test]
    fn test_external_labels_override_by_default() {
        let classifier = ContextClassifier::default();
        let labels: LabelMap = [(120.5, AmountType::Paid)].into_iter().collect();
        let outcome = classifier.classify_with_labels(
            &[120.5],
            "Total: $120.50",
            &tokens(&["$120.50"]),
            Some(&labels),
        );
        assert_eq!(types(outcome.output().unwrap()), vec![(AmountType::Paid, 120.5)]);
    }

    #[test]
    fn test_context_wins_when_external_not_preferred() {
        let options = ClassifierOptions {
            prefer_external: false,
            ..ClassifierOptions::default()
        };
        let classifier = ContextClassifier::new(options);
        let labels: LabelMap = [(120.5, AmountType::Paid), (7.0, AmountType::Tax)]
            .into_iter()
            .collect();

        let located = classifier.classify_with_labels(
            &[120.5],
            "Total: $120.50",
            &tokens(&["$120.50"]),
            Some(&labels),
        );
        assert_eq!(types(located.output().unwrap()), vec![(AmountType::TotalBill, 120.5)]);

        // Context has nothing to say about 7, so the external label is used
        let silent = classifier.classify_with_labels(&[7.0], "ref 7", &tokens(&["7"]), Some(&labels));
        assert_eq!(types(silent.output().unwrap()), vec![(AmountType::Tax, 7.0)]);
    }

    #[test]
    fn test_explicit_fallback_merges_new_values() {
        let classifier = ContextClassifier::default();
        // 42 is too far from the total line to pick up its keyword
        let text = "Ref 42\nthank you for shopping with us, please visit again soon!!\nTotal:300";
        let outcome = classifier.classify_with_labels(&[42.0], text, &tokens(&["42"]), None);
        let output = outcome.output().unwrap();
        assert_eq!(
            types(output),
            vec![(AmountType::Unknown, 42.0), (AmountType::TotalBill, 300.0)]
        );
        assert_eq!(output.amounts[1].source, EXPLICIT_SOURCE);
        assert_eq!(output.confidence, 0.7);
    }

    #[test]
    fn test_explicit_fallback_skips_present_values() {
        let options = ClassifierOptions::default();
        let classifier = ContextClassifier::new(options);
        let labels: LabelMap = [(300.0, AmountType::Discount)].into_iter().collect();
        let outcome = classifier.classify_with_labels(
            &[300.0],
            "Total:300",
            &tokens(&["300"]),
            Some(&labels),
        );
        assert_eq!(
            types(outcome.output().unwrap()),
            vec![(AmountType::Discount, 300.0)]
        );
    }

    #[test]
    fn test_explicit_fallback_keeps_equal_total_and_paid() {
        let classifier = ContextClassifier::default();
        let labels: LabelMap = [(7.0, AmountType::Tax)].into_iter().collect();
        let text = "Total: 500\nPaid: 500\nDue: 0";
        let outcome = classifier.classify_with_labels(&[7.0], text, &tokens(&["7"]), Some(&labels));
        let output = outcome.output().unwrap();
        assert_eq!(
            types(output),
            vec![
                (AmountType::Tax, 7.0),
                (AmountType::TotalBill, 500.0),
                (AmountType::Paid, 500.0),
                (AmountType::Due, 0.0),
            ]
        );

        let finals = Finalizer::new().finalize(&output.amounts, CurrencyHint::Unknown, text);
        let roles: Vec<_> = finals
            .output()
            .unwrap()
            .amounts
            .iter()
            .map(|a| (a.role, a.value))
            .collect();
        assert_eq!(
            roles,
            vec![
                (RequiredRole::TotalBill, 500.0),
                (RequiredRole::Paid, 500.0),
                (RequiredRole::Due, 0.0),
            ]
        );
    }

    #[test]
    fn test_empty_values_guardrail() {
        let outcome = ContextClassifier::default().classify_with_labels(&[], "Total 5", &[], None);
        assert_eq!(outcome.guardrail().unwrap().reason, "no normalized amounts");
    }

    #[test]
    fn test_originating_token_falls_back_to_value() {
        assert_eq!(originating_token(1500.0, &tokens(&["Rs. 1,500"])), "Rs. 1,500");
        assert_eq!(originating_token(7.5, &tokens(&["Rs. 1,500"])), "7.5");
        assert_eq!(originating_token(120.0, &tokens(&["l2O"])), "l2O");
    }

    struct FailingService;

    #[async_trait]
    impl LabelService for FailingService {
        fn name(&self) -> &str {
            "failing"
        }

        async fn label_values(&self, _text: &str, _values: &[f64]) -> Result<LabelMap, LabelError> {
            Err(LabelError::Malformed("not json".to_string()))
        }
    }

    struct SlowService;

    #[async_trait]
    impl LabelService for SlowService {
        fn name(&self) -> &str {
            "slow"
        }

        async fn label_values(&self, _text: &str, _values: &[f64]) -> Result<LabelMap, LabelError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(LabelMap::new())
        }
    }

    #[tokio::test]
    async fn test_failing_service_falls_back_to_context() {
        let classifier = ContextClassifier::default().with_label_service(Arc::new(FailingService));
        let outcome = classifier
            .classify(&[120.5], "Total: $120.50", &tokens(&["$120.50"]))
            .await;
        assert_eq!(types(outcome.output().unwrap()), vec![(AmountType::TotalBill, 120.5)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_service_times_out() {
        let options = ClassifierOptions {
            label_timeout: Duration::from_millis(50),
            ..ClassifierOptions::default()
        };
        let classifier = ContextClassifier::new(options).with_label_service(Arc::new(SlowService));
        let outcome = classifier
            .classify(&[120.5], "Total: $120.50", &tokens(&["$120.50"]))
            .await;
        assert_eq!(types(outcome.output().unwrap()), vec![(AmountType::TotalBill, 120.5)]);
    }

    #[tokio::test]
    async fn test_service_labels_are_applied() {
        let labels: LabelMap = [(500.0, AmountType::Due)].into_iter().collect();
        let classifier = ContextClassifier::default()
            .with_label_service(Arc::new(StaticLabelService::new(labels)));
        let outcome = classifier
            .classify(&[500.0], "Amount 500", &tokens(&["500"]))
            .await;
        assert_eq!(types(outcome.output().unwrap()), vec![(AmountType::Due, 500.0)]);
    }
}
