//! CSV operation scripts and summary output for the binary.
//!
//! Input: one operation per row (`op,card,account,amount,dest`). Output:
//! one [`AccountSummary`] row per account. Rejected operations are logged
//! and skipped; malformed CSV aborts the run.

use std::io;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::account::AccountKind;
use crate::clock::Clock;
use crate::engine::{default_max_loan, Engine};
use crate::receipt::AccountSummary;
use crate::CardNumber;

/// Operations a script row can request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum RawOpType {
    Deposit,
    Withdraw,
    Transfer,
    Loan,
    /// Admin-only: apply monthly interest to every account
    Interest,
}

/// One script row. Unused columns stay empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct RawOp {
    pub op: RawOpType,
    pub card: CardNumber,
    pub account: Option<AccountKind>,
    pub amount: Option<Decimal>,
    pub dest: Option<CardNumber>,
}

fn apply_one<C: Clock>(engine: &Engine<'_, C>, raw: &RawOp) -> anyhow::Result<()> {
    use anyhow::Context;

    match raw.op {
        RawOpType::Deposit => {
            let kind = raw.account.context("deposit needs an account column")?;
            let amount = raw.amount.context("deposit needs an amount column")?;
            engine.deposit(&raw.card, kind, amount)?;
        }
        RawOpType::Withdraw => {
            let kind = raw.account.context("withdraw needs an account column")?;
            let amount = raw.amount.context("withdraw needs an amount column")?;
            engine.withdraw(&raw.card, kind, amount)?;
        }
        RawOpType::Transfer => {
            let kind = raw.account.context("transfer needs an account column")?;
            let amount = raw.amount.context("transfer needs an amount column")?;
            let dest = raw.dest.as_deref().context("transfer needs a dest column")?;
            engine.transfer(&raw.card, kind, dest, amount)?;
        }
        RawOpType::Loan => {
            let amount = raw.amount.context("loan needs an amount column")?;
            engine.apply_loan(&raw.card, amount, default_max_loan())?;
        }
        RawOpType::Interest => {
            let identity = engine.identity(&raw.card)?;
            anyhow::ensure!(identity.is_admin(), "interest batch requires an admin card");
            engine.apply_monthly_interest_to_all();
        }
    }
    Ok(())
}

/// Read operations from `input` and apply them in order. Engine-rejected
/// operations are logged and skipped, mirroring an ATM that refuses one
/// request and keeps serving.
pub fn apply_script<R: io::Read, C: Clock>(input: R, engine: &Engine<'_, C>) -> anyhow::Result<()> {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All);
    let mut rdr = builder.from_reader(input);

    for record in rdr.deserialize() {
        let raw: RawOp = record?;
        if let Err(err) = apply_one(engine, &raw) {
            warn!(op = ?raw.op, card = %raw.card, error = %err, "operation rejected");
        }
    }
    Ok(())
}

/// Serialize summary rows as CSV, headers included
pub fn write_summaries<W: io::Write>(wr: W, rows: &[AccountSummary]) -> anyhow::Result<()> {
    let mut wr = csv::WriterBuilder::new().from_writer(wr);
    for row in rows {
        wr.serialize(row)?;
    }
    wr.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::FixedClock;
    use crate::registry::AccountRegistry;
    use chrono::NaiveDate;

    fn clock() -> FixedClock {
        FixedClock::at(
            NaiveDate::from_ymd_opt(2026, 8, 29)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn raw_op_input_format() {
        let raw = r#"op, card, account, amount, dest
deposit, 12345678, savings, 500,
transfer, 12345678, savings, 100, 87654321
interest, 00000000,,,"#;

        let mut builder = csv::ReaderBuilder::new();
        builder.trim(csv::Trim::All);
        let rows: Vec<RawOp> = builder
            .from_reader(raw.as_bytes())
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            rows[0],
            RawOp {
                op: RawOpType::Deposit,
                card: "12345678".to_string(),
                account: Some(AccountKind::Savings),
                amount: Some(Decimal::new(500, 0)),
                dest: None,
            }
        );
        assert_eq!(rows[1].dest.as_deref(), Some("87654321"));
        assert_eq!(rows[2].op, RawOpType::Interest);
        assert_eq!(rows[2].account, None);
        assert_eq!(rows[2].amount, None);
    }

    #[test]
    fn summary_output_format() {
        let rows = vec![AccountSummary {
            card: "12345678".to_string(),
            kind: AccountKind::Savings,
            balance: Decimal::new(10_000, 0),
            daily_withdrawn: Decimal::ZERO,
            locked: false,
        }];
        let mut out = Vec::new();
        write_summaries(&mut out, &rows).unwrap();

        let expected = "card,kind,balance,daily_withdrawn,locked\n12345678,savings,10000,0,false\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn script_applies_in_order_and_skips_rejected_rows() {
        let clock = clock();
        let registry = AccountRegistry::sample(clock.now());
        let engine = Engine::new(&registry, &clock);

        let script = r#"op,card,account,amount,dest
deposit,12345678,savings,500,
withdraw,12345678,current,1000,
transfer,12345678,savings,100,87654321
withdraw,12345678,savings,99999,
loan,99999999,,1000,
interest,00000000,,,"#;

        apply_script(script.as_bytes(), &engine).unwrap();

        // 10000 + 500 - 100 transfer, then 0.5% interest on 10400
        assert_eq!(
            engine.balance("12345678", AccountKind::Savings).unwrap(),
            Decimal::new(10_452, 0)
        );
        assert_eq!(
            engine.balance("12345678", AccountKind::Current).unwrap(),
            Decimal::new(6000, 0)
        );
        assert_eq!(
            engine.balance("87654321", AccountKind::Current).unwrap(),
            Decimal::new(8100, 0)
        );
    }

    #[test]
    fn interest_row_requires_an_admin_card() {
        let clock = clock();
        let registry = AccountRegistry::sample(clock.now());
        let engine = Engine::new(&registry, &clock);

        let script = "op,card,account,amount,dest\ninterest,12345678,,,\n";
        apply_script(script.as_bytes(), &engine).unwrap();

        // rejected row changed nothing
        assert_eq!(
            engine.balance("12345678", AccountKind::Savings).unwrap(),
            Decimal::new(10_000, 0)
        );
    }
}
