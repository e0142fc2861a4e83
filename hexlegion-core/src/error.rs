//! Engine error types

use crate::species::SpeciesId;

/// A rule that rejected a command. The match state is untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("the game is over")]
    GameOver,

    #[error("it is not this player's turn to act")]
    NotYourTurn,

    #[error("cannot {0} in the current phase")]
    WrongPhase(&'static str),

    #[error("legion belongs to another player")]
    NotOwner,

    #[error("legion of height {height} cannot split on turn {turn}")]
    CannotSplit { height: usize, turn: u32 },

    #[error("split does not divide the legion legally")]
    IllegalSplit,

    #[error("marker is not available to this player")]
    MarkerUnavailable,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("legion has already moved this turn")]
    AlreadyMoved,

    #[error("destination is not a legal move")]
    IllegalMove,

    #[error("no mulligan available")]
    MulliganUnavailable,

    #[error("an eight-high legion must split on the first turn")]
    MustSplitFirst,

    #[error("at least one legion must move")]
    MustMoveALegion,

    #[error("legion is not eligible to recruit")]
    NotEligibleToRecruit,

    #[error("legion has already recruited this turn")]
    AlreadyRecruited,

    #[error("legion is already at maximum height")]
    LegionFull,

    #[error("recruit and recruiters are not a legal combination here")]
    IllegalRecruit,

    #[error("no creature of that species left in the pool")]
    PoolExhausted,

    #[error("no engagement at that hex")]
    NoEngagement,

    #[error("another engagement is still being resolved")]
    EngagementInProgress,

    #[error("pending summon, reinforcement or acquisition must be resolved first")]
    PendingDecisions,

    #[error("legion may not flee")]
    CannotFlee,

    #[error("no battle is in progress")]
    NotInBattle,

    #[error("creature cannot move there")]
    IllegalCreatureMove,

    #[error("creature has already moved")]
    CreatureAlreadyMoved,

    #[error("creature has already struck")]
    AlreadyStruck,

    #[error("target cannot be struck by this creature")]
    IllegalTarget,

    #[error("engaged creatures still have to strike")]
    ForcedStrikesRemain,

    #[error("no carry is pending")]
    CarryNotPending,

    #[error("creature cannot receive the carry")]
    IllegalCarryTarget,

    #[error("summoning is not possible now")]
    IllegalSummon,

    #[error("no reinforcement is pending")]
    NoReinforcementPending,

    #[error("no acquisition is pending for that legion")]
    NoAcquisitionPending,

    #[error("requested creatures exceed the offer")]
    IllegalAcquisition,
}

/// Error returned by engine entry points
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Illegal action; nothing was applied
    #[error("illegal action: {0}")]
    Illegal(#[from] Rejection),

    /// Engine defect; the match halts
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The match halted on an earlier invariant violation
    #[error("match halted: {0}")]
    Halted(String),
}

impl EngineError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            EngineError::Illegal(r) => Some(r),
            _ => None,
        }
    }
}

/// Creature pool error
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("species {0:?} has none remaining")]
    Exhausted(SpeciesId),

    #[error("species {0:?} is not in the pool")]
    UnknownSpecies(SpeciesId),
}

/// Static data that cannot be loaded or does not hang together
#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    #[error("cannot read variant file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed variant JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown species name {0:?}")]
    UnknownSpecies(String),

    #[error("strategic board: {0}")]
    Board(String),

    #[error("invalid variant: {0}")]
    Invalid(String),
}

/// Seats that cannot form a game
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("need between 2 and {max} players, got {got}")]
    PlayerCount { got: usize, max: usize },

    #[error("color {0:?} taken by two players")]
    DuplicateColor(crate::player::Color),

    #[error("no markers defined for color {0:?}")]
    NoMarkers(crate::player::Color),

    #[error(transparent)]
    Variant(#[from] VariantError),

    #[error("creature pool cannot supply the starting legions")]
    Pool(#[from] PoolError),
}

impl From<PoolError> for Rejection {
    fn from(_: PoolError) -> Self {
        Rejection::PoolExhausted
    }
}
