use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

//quarterly contract month codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonthCode {
    H,
    M,
    U,
    Z,
}

impl MonthCode {
    pub fn letter(&self) -> char {
        match self {
            MonthCode::H => 'H',
            MonthCode::M => 'M',
            MonthCode::U => 'U',
            MonthCode::Z => 'Z',
        }
    }

    //expiration month of the contract
    pub fn month(&self) -> u32 {
        match self {
            MonthCode::H => 3,
            MonthCode::M => 6,
            MonthCode::U => 9,
            MonthCode::Z => 12,
        }
    }
}

//a resolved front-month contract, eg H/2024
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMonth {
    pub code: MonthCode,
    pub year: i32,
}

impl ContractMonth {
    //single year digit used in exchange tickers
    pub fn year_digit(&self) -> i32 {
        self.year.rem_euclid(10)
    }
}

impl fmt::Display for ContractMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.code.letter(), self.year_digit())
    }
}

//third friday of the month, the standard quarterly expiration day
pub fn third_friday(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Fri, 3)
}

//the thursday before the third friday
pub fn roll_date(year: i32, month: u32) -> Option<NaiveDate> {
    third_friday(year, month).map(|d| d - Duration::days(1))
}

//roll events relevant for a year, each naming the contract active from that day on
fn roll_events(year: i32) -> Vec<(NaiveDate, ContractMonth)> {
    let schedule = [
        (year - 1, 12, MonthCode::H, year),
        (year, 3, MonthCode::M, year),
        (year, 6, MonthCode::U, year),
        (year, 9, MonthCode::Z, year),
        (year, 12, MonthCode::H, year + 1),
    ];

    let mut events: Vec<_> = schedule
        .iter()
        .filter_map(|&(y, m, code, contract_year)| {
            roll_date(y, m).map(|d| (d, ContractMonth { code, year: contract_year }))
        })
        .collect();
    events.sort_by_key(|(d, _)| *d);
    events
}

//maps calendar days to the front-month contract of one root symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResolver {
    pub root: String,
}

impl RollResolver {
    pub fn new(root: impl Into<String>) -> Self {
        RollResolver { root: root.into() }
    }

    //contract active on the given day, the roll thursday itself belongs to the new contract
    pub fn contract_for(&self, date: NaiveDate) -> ContractMonth {
        roll_events(date.year())
            .into_iter()
            .take_while(|(roll, _)| *roll <= date)
            .last()
            .map(|(_, contract)| contract)
            .unwrap_or(ContractMonth {
                code: MonthCode::H,
                year: date.year(),
            })
    }

    //ticker of the active contract, eg NQH4
    pub fn resolve(&self, date: NaiveDate) -> String {
        format!("{}{}", self.root, self.contract_for(date))
    }
}

impl Default for RollResolver {
    fn default() -> Self {
        RollResolver::new("NQ")
    }
}
