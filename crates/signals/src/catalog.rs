//! Built-in signals.
//!
//! Every evaluator reads only the [`SignalContext`]; facts it depends on are
//! computed upstream from point-in-time data.

use axiom_core::signal::facts;
use axiom_core::{MarketType, SignalContext, SignalReading};

use crate::registry::SignalRegistry;

/// Projected spreads tighter than this count as a small spread.
pub const SMALL_SPREAD_POINTS: f64 = 3.0;

/// Games against the opponent needed for a trustworthy head-to-head sample.
pub const VS_OPPONENT_MIN_GAMES: f64 = 3.0;

/// Coefficient of variation below which a performer counts as consistent.
pub const CONSISTENT_MAX_CV: f64 = 0.3;

/// Average minutes at or above which playing time counts as stable.
pub const STABLE_MINUTES: f64 = 28.0;

/// Edge-band cutoffs on absolute edge percentage.
pub const EDGE_BAND_STRONG: f64 = 15.0;
pub const EDGE_BAND_GOOD: f64 = 10.0;
pub const EDGE_BAND_MARGINAL: f64 = 5.0;

pub const EDGE_BAND_CATEGORIES: [&str; 4] = ["strong", "good", "marginal", "none"];

/// Points by which the model must like the home side more than the market.
pub const HOME_EDGE_STRONG: f64 = 7.0;
pub const HOME_EDGE_SOLID: f64 = 5.0;

pub const HOME_EDGE_CATEGORIES: [&str; 3] = ["plus_7", "plus_5", "none"];

/// Registers every built-in signal.
pub fn register_builtin(registry: &mut SignalRegistry) {
    registry.register_flag(
        "injury_adjustment_zero",
        "No injury adjustment applied to the entity",
        injury_adjustment_zero,
    );
    registry.register_flag(
        "small_spread",
        "Projected spread within 3 points",
        small_spread,
    );
    registry.register_flag(
        "back_to_back",
        "Either side played the previous day",
        back_to_back,
    );
    registry.register_flag(
        "opponent_back_to_back",
        "Opponent played the previous day",
        opponent_back_to_back,
    );
    registry.register_flag(
        "player_rested",
        "Entity did not play the previous day",
        player_rested,
    );
    registry.register_flag(
        "vs_opponent_sample",
        "At least 3 prior games against this opponent",
        vs_opponent_sample,
    );
    registry.register_flag(
        "consistent_performer",
        "Recent coefficient of variation below 0.3",
        consistent_performer,
    );
    registry.register_flag(
        "minutes_stable",
        "Averaging at least 28 minutes",
        minutes_stable,
    );
    registry.register_flag(
        "green_zone",
        "Spread with a small projected margin or a back-to-back on either side",
        green_zone,
    );
    registry.register_categorical(
        "home_edge",
        "Model favors the home side and beats the spread by 5 or 7 points",
        &HOME_EDGE_CATEGORIES,
        home_edge,
    );
    registry.register_categorical(
        "edge_band",
        "Size of the absolute edge percentage",
        &EDGE_BAND_CATEGORIES,
        edge_band,
    );
}

fn injury_adjustment_zero(ctx: &SignalContext) -> SignalReading {
    SignalReading::Flag(ctx.fact(facts::INJURY_ADJUSTMENT).unwrap_or(0.0) == 0.0)
}

fn small_spread(ctx: &SignalContext) -> SignalReading {
    SignalReading::Flag(ctx.market == MarketType::Spread && ctx.projection.abs() < SMALL_SPREAD_POINTS)
}

fn back_to_back(ctx: &SignalContext) -> SignalReading {
    SignalReading::Flag(
        ctx.flag(facts::ENTITY_BACK_TO_BACK) || ctx.flag(facts::OPPONENT_BACK_TO_BACK),
    )
}

fn green_zone(ctx: &SignalContext) -> SignalReading {
    let fired = ctx.market == MarketType::Spread
        && (ctx.projection.abs() < SMALL_SPREAD_POINTS
            || ctx.flag(facts::ENTITY_BACK_TO_BACK)
            || ctx.flag(facts::OPPONENT_BACK_TO_BACK));
    SignalReading::Flag(fired)
}

fn home_edge(ctx: &SignalContext) -> SignalReading {
    // A negative home spread is a projected home win.
    let favors_home = ctx.market == MarketType::Spread && ctx.projection < 0.0;
    let edge = ctx.directional_edge();
    let band = if !favors_home {
        "none"
    } else if edge >= HOME_EDGE_STRONG {
        "plus_7"
    } else if edge >= HOME_EDGE_SOLID {
        "plus_5"
    } else {
        "none"
    };
    SignalReading::Category(band.to_string())
}

fn opponent_back_to_back(ctx: &SignalContext) -> SignalReading {
    SignalReading::Flag(ctx.flag(facts::OPPONENT_BACK_TO_BACK))
}

fn player_rested(ctx: &SignalContext) -> SignalReading {
    SignalReading::Flag(!ctx.flag(facts::ENTITY_BACK_TO_BACK))
}

fn vs_opponent_sample(ctx: &SignalContext) -> SignalReading {
    SignalReading::Flag(ctx.fact(facts::VS_OPPONENT_GAMES).unwrap_or(0.0) >= VS_OPPONENT_MIN_GAMES)
}

fn consistent_performer(ctx: &SignalContext) -> SignalReading {
    let mean = ctx.fact(facts::RECENT_MEAN).unwrap_or(0.0);
    let std_dev = ctx.fact(facts::RECENT_STD_DEV).unwrap_or(0.0);
    // Zero spread means too few games to judge, not perfect consistency.
    let fired = mean > 0.0 && std_dev > 0.0 && std_dev / mean < CONSISTENT_MAX_CV;
    SignalReading::Flag(fired)
}

fn minutes_stable(ctx: &SignalContext) -> SignalReading {
    SignalReading::Flag(ctx.fact(facts::AVG_MINUTES).unwrap_or(0.0) >= STABLE_MINUTES)
}

fn edge_band(ctx: &SignalContext) -> SignalReading {
    let pct = ctx.edge_pct.abs();
    let band = if pct >= EDGE_BAND_STRONG {
        "strong"
    } else if pct >= EDGE_BAND_GOOD {
        "good"
    } else if pct >= EDGE_BAND_MARGINAL {
        "marginal"
    } else {
        "none"
    };
    SignalReading::Category(band.to_string())
}
