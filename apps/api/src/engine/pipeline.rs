//! ATS Engine — composes extraction, comparison, component analysis, aggregation and
//! persistence into `run_full_analysis`, and exposes the read side of the store.
//!
//! Every intermediate result is appended to the versioned log as it is produced, so a run
//! that fails late still leaves its earlier stages in the audit trail.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::ComponentAnalyzer;
use crate::errors::EngineError;
use crate::llm_client::TextCapability;
use crate::matching::{
    ComparisonResult, DocumentKind, MatchComparator, RelevanceGate, SkillExtractor, SkillSet,
};
use crate::scoring::{build_recommendation, Aggregator, AtsResult, Recommendation, ScoringPolicy};
use crate::store::{
    AnalysisEntry, AnalysisKind, AnalysisPayload, CvPointer, CvType, FileRefs, LogKey,
    VersionMeta, VersionedResultStore,
};

/// Ids of the entries one run appended, one per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntries {
    pub comparison: Uuid,
    pub component_analysis: Uuid,
    pub ats_calculation: Uuid,
    pub recommendation: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub company: String,
    pub result: AtsResult,
    pub recommendation: Recommendation,
    pub entries: RunEntries,
}

pub struct AtsEngine {
    extractor: Arc<dyn SkillExtractor>,
    comparator: MatchComparator,
    analyzer: ComponentAnalyzer,
    aggregator: Aggregator,
    store: Arc<VersionedResultStore>,
}

impl AtsEngine {
    pub fn new(
        extractor: Arc<dyn SkillExtractor>,
        capability: Arc<dyn TextCapability>,
        policy: ScoringPolicy,
        store: Arc<VersionedResultStore>,
        component_timeout: Duration,
    ) -> Self {
        let analyzer = ComponentAnalyzer::new(capability, policy.min_components, component_timeout);
        Self {
            extractor,
            comparator: MatchComparator::new(RelevanceGate::new(&policy.relevance)),
            analyzer,
            aggregator: Aggregator::new(policy),
            store,
        }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        self.aggregator.policy()
    }

    /// Pure skill comparison, no persistence.
    pub fn compare(&self, cv: &SkillSet, jd: &SkillSet) -> Result<ComparisonResult, EngineError> {
        self.comparator.compare(cv, jd)
    }

    /// Extract → compare → analyze → aggregate → persist.
    ///
    /// Extraction and malformed input are fatal. Component failures are tolerated down to
    /// the policy quorum. A result that fails validation is still persisted, flagged with
    /// `validation_passed = false`.
    pub async fn run_full_analysis(
        &self,
        user_id: Uuid,
        company: &str,
        cv_text: &str,
        jd_text: &str,
        refs: FileRefs,
    ) -> Result<AnalysisRun, EngineError> {
        if cv_text.trim().is_empty() || jd_text.trim().is_empty() {
            return Err(EngineError::MalformedInput(
                "cv_text and jd_text must both be non-empty".to_string(),
            ));
        }
        let key = LogKey::new(user_id, company)?;
        let started = Instant::now();
        info!("Starting ATS analysis for {key}");

        let (cv_skills, jd_skills) = tokio::try_join!(
            self.extractor.extract(cv_text, DocumentKind::Cv),
            self.extractor.extract(jd_text, DocumentKind::JobDescription),
        )?;
        if jd_skills.is_empty() {
            warn!("No requirements extracted from the job description for {key}");
        }

        let comparison = self.comparator.compare(&cv_skills, &jd_skills)?;
        info!(
            "Matched {}/{} requirements ({:.1}%) for {key}",
            comparison.match_summary.total_matches,
            comparison.match_summary.total_jd_requirements,
            comparison.match_summary.match_percentage
        );
        let comparison_id = self
            .store
            .append(&key, AnalysisPayload::Comparison(comparison.clone()), refs.clone())
            .await?;

        let report = self.analyzer.analyze(cv_text, jd_text, &comparison).await?;
        let component_id = self
            .store
            .append(&key, AnalysisPayload::ComponentAnalysis(report.clone()), refs.clone())
            .await?;

        let mut result = self.aggregator.aggregate(&comparison, &report);
        result.processing_time_ms = started.elapsed().as_millis() as u64;
        if !result.validation_passed {
            warn!(
                "ATS result for {key} failed validation: {}",
                result.validation_issues.join("; ")
            );
        }
        let ats_id = self
            .store
            .append(&key, AnalysisPayload::AtsCalculation(result.clone()), refs.clone())
            .await?;

        let recommendation = build_recommendation(&comparison, &result);
        let recommendation_id = self
            .store
            .append(&key, AnalysisPayload::Recommendation(recommendation.clone()), refs)
            .await?;

        info!(
            "ATS analysis for {key} complete: {:.2} ({:?}), confidence {:.2}, {} ms",
            result.final_ats_score,
            result.category_status,
            result.confidence_score,
            result.processing_time_ms
        );

        Ok(AnalysisRun {
            company: key.company,
            result,
            recommendation,
            entries: RunEntries {
                comparison: comparison_id,
                component_analysis: component_id,
                ats_calculation: ats_id,
                recommendation: recommendation_id,
            },
        })
    }

    pub async fn get_latest(
        &self,
        user_id: Uuid,
        company: &str,
        kind: AnalysisKind,
    ) -> Result<AnalysisEntry, EngineError> {
        self.store.latest(&LogKey::new(user_id, company)?, kind).await
    }

    pub async fn list_versions(
        &self,
        user_id: Uuid,
        company: &str,
        kind: AnalysisKind,
    ) -> Result<Vec<VersionMeta>, EngineError> {
        self.store
            .list_versions(&LogKey::new(user_id, company)?, kind)
            .await
    }

    pub async fn set_cv_pointer(
        &self,
        user_id: Uuid,
        company: &str,
        cv_type: CvType,
        file_id: &str,
    ) -> Result<CvPointer, EngineError> {
        self.store
            .set_pointer(&LogKey::new(user_id, company)?, cv_type, file_id)
            .await
    }

    pub async fn cv_pointer(
        &self,
        user_id: Uuid,
        company: &str,
        cv_type: CvType,
    ) -> Result<CvPointer, EngineError> {
        self.store
            .pointer(&LogKey::new(user_id, company)?, cv_type)
            .await
    }

    pub async fn cleanup(&self, user_id: Uuid, company: &str) -> Result<usize, EngineError> {
        self.store.cleanup(&LogKey::new(user_id, company)?).await
    }
}
