use crate::portfolio::trade::Trade;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::Write;
use std::path::Path;

//which contract the roll resolver chose for a date and whether bars existed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolPick {
    pub date: NaiveDate,
    pub picked_symbol: String,
    pub has_data: bool,
}

//ordered trade ledger with csv output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    //builds a ledger in (date, entry_time) order, rows without an entry last within a date
    pub fn new(mut trades: Vec<Trade>) -> Self {
        trades.sort_by(ledger_order);
        TradeLedger { trades }
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn real_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_real())
    }

    pub fn trades_on(&self, date: NaiveDate) -> Vec<&Trade> {
        self.trades.iter().filter(|t| t.date == date).collect()
    }

    //distinct dates that appear in the ledger
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.trades.iter().map(|t| t.date).collect();
        dates.dedup();
        dates
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        write_rows(writer, &self.trades)
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

//per-date symbol picks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolPickLog {
    picks: Vec<SymbolPick>,
}

impl SymbolPickLog {
    pub fn new(mut picks: Vec<SymbolPick>) -> Self {
        picks.sort_by_key(|p| p.date);
        SymbolPickLog { picks }
    }

    pub fn picks(&self) -> &[SymbolPick] {
        &self.picks
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    //dates where the chosen contract had no bars
    pub fn missing(&self) -> impl Iterator<Item = &SymbolPick> {
        self.picks.iter().filter(|p| !p.has_data)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        write_rows(writer, &self.picks)
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

fn ledger_order(a: &Trade, b: &Trade) -> Ordering {
    a.date.cmp(&b.date).then_with(|| match (a.entry_time, b.entry_time) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::trade::TradeResult;
    use chrono::{TimeZone, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_sorted_by_date_then_entry_time() {
        let mut late = Trade::placeholder("NQH4", date(5), TradeResult::StopLoss);
        late.entry_time = Some(Utc.with_ymd_and_hms(2024, 3, 5, 15, 0, 0).unwrap());
        let mut early = Trade::placeholder("NQH4", date(5), TradeResult::TakeProfit);
        early.entry_time = Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0).unwrap());
        let empty = Trade::placeholder("NQH4", date(5), TradeResult::NoFill);
        let before = Trade::placeholder("NQH4", date(4), TradeResult::NoData);

        let ledger = TradeLedger::new(vec![empty, late, before, early]);
        let results: Vec<TradeResult> = ledger.trades().iter().map(|t| t.result).collect();
        assert_eq!(
            results,
            vec![
                TradeResult::NoData,
                TradeResult::TakeProfit,
                TradeResult::StopLoss,
                TradeResult::NoFill
            ]
        );
        assert_eq!(ledger.dates(), vec![date(4), date(5)]);
        assert_eq!(ledger.real_trades().count(), 2);
    }

    #[test]
    fn test_csv_has_header_and_tags() {
        let ledger = TradeLedger::new(vec![Trade::placeholder(
            "NQH4",
            date(4),
            TradeResult::SkipSmallStop,
        )]);
        let mut buf = Vec::new();
        ledger.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("symbol,date,entry_time,exit_time,direction"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("NQH4,2024-03-04,,,none"));
        assert!(row.contains("skip_small_stop"));
    }

    #[test]
    fn test_pick_log_reports_missing_dates() {
        let log = SymbolPickLog::new(vec![
            SymbolPick {
                date: date(5),
                picked_symbol: "NQH4".to_string(),
                has_data: false,
            },
            SymbolPick {
                date: date(4),
                picked_symbol: "NQH4".to_string(),
                has_data: true,
            },
        ]);
        assert_eq!(log.picks()[0].date, date(4));
        assert_eq!(log.missing().count(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picks.csv");
        log.save_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,picked_symbol,has_data"));
        assert!(text.contains("2024-03-05,NQH4,false"));
    }
}
