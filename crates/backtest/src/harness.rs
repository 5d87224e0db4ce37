//! Historical replay of the prediction pipeline.
//!
//! For each date in the range the harness borrows a point-in-time view,
//! scores the slate, and grades every pick against ground truth. Dates are
//! independent, so they may run on a rayon pool; partial tallies are merged
//! afterwards in date order by a single reducer.
//!
//! A date fails as a unit when its data is inconsistent: the slate cannot be
//! read, any entity reports a data-integrity error, or a realized value is
//! unusable. Failed dates are logged, counted, and left out of the totals.
//! Ground truth is only ever read.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use axiom_core::{
    BacktestSettings, DataConfig, EngineError, EngineResult, OutcomeRecord, OutcomeSource,
    PredictionContext, ResultLedger, StatRepository,
};
use axiom_data::InMemoryStatRepository;
use axiom_strategy::Predictor;
use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::pit::PointInTimeView;
use crate::report::{BacktestReport, SkippedDate, TierTallies};

/// Tallies for one completed date.
#[derive(Debug, Clone, Default)]
struct DayTally {
    tallies: TierTallies,
    graded: Vec<OutcomeRecord>,
    predictions: usize,
    skipped_entities: usize,
    ungraded: usize,
}

#[derive(Debug, Clone)]
enum DateOutcome {
    Completed(DayTally),
    Skipped(SkippedDate),
    /// Not started because a stop was requested.
    Interrupted,
}

/// Report plus the graded picks behind it.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub report: BacktestReport,
    /// Date order, then slate order within a date.
    pub graded: Vec<OutcomeRecord>,
}

impl BacktestRun {
    /// Appends every graded pick to a ledger. Returns how many were new.
    ///
    /// # Errors
    /// Returns the first ledger write error.
    pub fn record_to(&self, ledger: &mut dyn ResultLedger) -> Result<usize> {
        let mut appended = 0;
        for record in &self.graded {
            if ledger.append(record.clone())? {
                appended += 1;
            }
        }
        Ok(appended)
    }
}

pub struct BacktestHarness {
    predictor: Predictor,
    settings: BacktestSettings,
    data: DataConfig,
    stop: Arc<AtomicBool>,
}

impl BacktestHarness {
    /// # Errors
    /// Returns `InvalidConfiguration` when the backtest or data settings are invalid.
    pub fn new(
        predictor: Predictor,
        settings: BacktestSettings,
        data: DataConfig,
    ) -> EngineResult<Self> {
        settings.validate()?;
        data.validate()?;
        Ok(Self {
            predictor,
            settings,
            data,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shares an externally owned stop flag, e.g. one set by a Ctrl-C handler.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[must_use]
    pub fn settings(&self) -> &BacktestSettings {
        &self.settings
    }

    /// Replays `[start, end]` against `repo` and grades with `outcomes`.
    ///
    /// The stop flag is checked before each date. When it is set, dates not
    /// yet started are dropped and the report covers the contiguous prefix
    /// that finished.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `start` is after `end`.
    pub fn run<O>(
        &self,
        repo: &InMemoryStatRepository,
        outcomes: &O,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<BacktestRun>
    where
        O: OutcomeSource + ?Sized,
    {
        if start > end {
            return Err(EngineError::config(format!(
                "backtest start {start} is after end {end}"
            )));
        }
        let dates: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
        info!(
            profile = %self.predictor.profile().name,
            %start,
            %end,
            dates = dates.len(),
            parallel = self.settings.parallel,
            "backtest started"
        );

        let outcomes_by_date: Vec<(NaiveDate, DateOutcome)> = if self.settings.parallel {
            dates
                .par_iter()
                .map(|&date| (date, self.guarded(repo, outcomes, date)))
                .collect()
        } else {
            let mut done = Vec::with_capacity(dates.len());
            for &date in &dates {
                let outcome = self.guarded(repo, outcomes, date);
                let stop = matches!(outcome, DateOutcome::Interrupted);
                done.push((date, outcome));
                if stop {
                    break;
                }
            }
            done
        };

        let run = self.reduce(start, end, outcomes_by_date);
        info!(
            run_id = %run.report.run_id,
            graded = run.report.total_count(),
            skipped_dates = run.report.skipped_dates,
            interrupted = run.report.interrupted,
            "backtest finished"
        );
        Ok(run)
    }

    fn guarded<O>(&self, repo: &InMemoryStatRepository, outcomes: &O, date: NaiveDate) -> DateOutcome
    where
        O: OutcomeSource + ?Sized,
    {
        if self.stop.load(Ordering::SeqCst) {
            return DateOutcome::Interrupted;
        }
        match self.evaluate_date(repo, outcomes, date) {
            Ok(day) => DateOutcome::Completed(day),
            Err(e) => {
                warn!(%date, error = %e, "date skipped");
                DateOutcome::Skipped(SkippedDate {
                    date,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn evaluate_date<O>(
        &self,
        repo: &InMemoryStatRepository,
        outcomes: &O,
        date: NaiveDate,
    ) -> EngineResult<DayTally>
    where
        O: OutcomeSource + ?Sized,
    {
        let view = PointInTimeView::new(repo, date, self.settings.decision_time);
        let ctx = PredictionContext::new(self.data.season_for(date), view.as_of());

        let batch = self.predictor.predict_slate(&view, &ctx, date)?;
        if let Some(failure) = batch.integrity_failure() {
            return Err(EngineError::integrity(date, failure.reason.clone()));
        }

        let mut day = DayTally {
            predictions: batch.predictions.len(),
            skipped_entities: batch.skipped.len(),
            ..DayTally::default()
        };

        for prediction in &batch.predictions {
            let fixture = &prediction.fixture;
            if prediction.pick().is_none() {
                continue;
            }
            let Some(actual) = outcomes.actual(&fixture.entity_id, fixture.market, date)? else {
                day.ungraded += 1;
                continue;
            };
            if let Some(record) = OutcomeRecord::settle(prediction, actual) {
                let closing = repo.closing_line(&fixture.entity_id, fixture.market, date);
                let record = record.with_closing_line(closing);
                day.tallies.entry(record.tier).or_default().add(record.result);
                day.graded.push(record);
            }
        }

        debug!(
            %date,
            predictions = day.predictions,
            graded = day.graded.len(),
            ungraded = day.ungraded,
            "date graded"
        );
        Ok(day)
    }

    /// Single-writer merge in date order.
    fn reduce(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        outcomes_by_date: Vec<(NaiveDate, DateOutcome)>,
    ) -> BacktestRun {
        let mut tallies = TierTallies::new();
        let mut graded = Vec::new();
        let mut skipped = Vec::new();
        let mut dates_evaluated = 0;
        let mut predictions = 0;
        let mut skipped_entities = 0;
        let mut ungraded = 0;
        let mut completed_through = None;
        let mut interrupted = false;

        let ordered: BTreeMap<NaiveDate, DateOutcome> = outcomes_by_date.into_iter().collect();
        for (date, outcome) in ordered {
            match outcome {
                DateOutcome::Completed(day) => {
                    for (tier, tally) in &day.tallies {
                        tallies.entry(*tier).or_default().merge(tally);
                    }
                    graded.extend(day.graded);
                    dates_evaluated += 1;
                    predictions += day.predictions;
                    skipped_entities += day.skipped_entities;
                    ungraded += day.ungraded;
                }
                DateOutcome::Skipped(skip) => skipped.push(skip),
                DateOutcome::Interrupted => {
                    interrupted = true;
                    break;
                }
            }
            completed_through = Some(date);
        }

        let profile = self.predictor.profile();
        let mut report =
            BacktestReport::with_tallies(&profile.name, &tallies, &profile.tiers, &self.settings);
        report.start = Some(start);
        report.end = Some(end);
        report.dates_evaluated = dates_evaluated;
        report.skipped_dates = skipped.len();
        report.skipped = skipped;
        report.completed_through = completed_through;
        report.interrupted = interrupted;
        report.predictions = predictions;
        report.skipped_entities = skipped_entities;
        report.ungraded = ungraded;

        BacktestRun { report, graded }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axiom_core::ModelProfile;
    use axiom_data::GroundTruth;
    use axiom_signals::SignalRegistry;

    fn harness() -> BacktestHarness {
        let predictor =
            Predictor::new(&ModelProfile::nba_spread(), &SignalRegistry::with_builtin()).unwrap();
        BacktestHarness::new(predictor, BacktestSettings::default(), DataConfig::default()).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = harness()
            .run(&InMemoryStatRepository::new(), &GroundTruth::new(), day(5), day(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn empty_repository_completes_every_date() {
        let run = harness()
            .run(&InMemoryStatRepository::new(), &GroundTruth::new(), day(1), day(3))
            .unwrap();
        assert_eq!(run.report.dates_evaluated, 3);
        assert_eq!(run.report.completed_through, Some(day(3)));
        assert!(!run.report.interrupted);
        assert_eq!(run.report.total_count(), 0);
        assert!(run.graded.is_empty());
    }

    #[test]
    fn preset_stop_flag_runs_nothing() {
        let h = harness();
        h.stop_flag().store(true, Ordering::SeqCst);
        let run = h
            .run(&InMemoryStatRepository::new(), &GroundTruth::new(), day(1), day(3))
            .unwrap();
        assert!(run.report.interrupted);
        assert_eq!(run.report.dates_evaluated, 0);
        assert_eq!(run.report.completed_through, None);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let predictor =
            Predictor::new(&ModelProfile::nba_spread(), &SignalRegistry::with_builtin()).unwrap();
        let settings = BacktestSettings {
            null_hit_rate: 1.5,
            ..BacktestSettings::default()
        };
        assert!(BacktestHarness::new(predictor, settings, DataConfig::default()).is_err());
    }
}
