use rust_decimal::Decimal;

/// Fee schedule is a pure function of (role, market, notional); deterministic
/// and otherwise out of scope (§4.3). `BasisPointsFeeSchedule` is the
/// reference implementation, configured per market from `fee_schedule` in
/// the exchange's `Config`.
pub trait FeeSchedule: Send + Sync {
    fn maker_fee(&self, market: &str, notional: Decimal) -> Decimal;
    fn taker_fee(&self, market: &str, notional: Decimal) -> Decimal;
}

pub struct BasisPointsFeeSchedule {
    pub maker_bps: Decimal,
    pub taker_bps: Decimal,
}

impl BasisPointsFeeSchedule {
    pub fn new(maker_bps: Decimal, taker_bps: Decimal) -> Self {
        Self { maker_bps, taker_bps }
    }
}

impl FeeSchedule for BasisPointsFeeSchedule {
    fn maker_fee(&self, _market: &str, notional: Decimal) -> Decimal {
        notional * self.maker_bps / Decimal::from(10_000)
    }

    fn taker_fee(&self, _market: &str, notional: Decimal) -> Decimal {
        notional * self.taker_bps / Decimal::from(10_000)
    }
}

/// No fees at all; useful for tests and demos that want to assert exact
/// round-number balances.
pub struct NoFees;

impl FeeSchedule for NoFees {
    fn maker_fee(&self, _market: &str, _notional: Decimal) -> Decimal {
        Decimal::ZERO
    }

    fn taker_fee(&self, _market: &str, _notional: Decimal) -> Decimal {
        Decimal::ZERO
    }
}
