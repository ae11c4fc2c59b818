use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    validation::is_valid_postal_code,
};

/**
 * Default number of elements returned by list operations.
 */
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/**
 * Largest page a client may request.
 */
pub const MAX_PAGE_SIZE: i64 = 500;

/**
 * Pagination input used by every list operation.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationInput {
    /**
     * Index of the first element.
     */
    pub start_index: i64,
    /**
     * Maximum number of elements to return.
     */
    pub page_size: i64,
}

impl PaginationInput {
    /**
     * Creates pagination input, defaulting missing values.
     */
    pub fn new(start_index: Option<i64>, page_size: Option<i64>) -> Self {
        PaginationInput { start_index: start_index.unwrap_or(0), page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE) }
    }

    /**
     * Validates the pagination input.
     *
     * # Returns
     * The input itself or a validation error.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.start_index < 0 {
            return Err(ApplicationError::new(ErrorType::Validation, "Start index cannot be negative".to_string()));
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(ApplicationError::new(ErrorType::Validation, format!("Page size must be between 1 and {MAX_PAGE_SIZE}")));
        }
        Ok(self)
    }
}

/**
 * Pagination information returned by list operations.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOutput {
    pub start_index: i64,
    pub page_size: i64,
    pub has_more: bool,
}

impl PaginationOutput {
    pub fn new(start_index: i64, page_size: i64, has_more: bool) -> Self {
        PaginationOutput { start_index, page_size, has_more }
    }
}

/**
 * A page of elements together with pagination information.
 */
#[derive(Debug, Clone)]
pub struct ListOutputType<T> {
    pub elements: Vec<T>,
    pub pagination: PaginationOutput,
}

impl<T> ListOutputType<T> {
    pub fn new(elements: Vec<T>, pagination: PaginationOutput) -> Self {
        ListOutputType { elements, pagination }
    }
}

/**
 * Postal address with Italian administrative codes.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FullAddress {
    pub street: Option<String>,
    pub country_code: Option<String>,
    pub country: Option<String>,
    pub region_code: Option<String>,
    pub region: Option<String>,
    pub province_code: Option<String>,
    pub province: Option<String>,
    pub city_code: Option<String>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
}

impl FullAddress {
    /**
     * Checks the postal code against the address country.
     *
     * # Returns
     * A message describing the problem, if any.
     */
    pub fn postal_code_error(&self) -> Option<String> {
        let postal_code = self.postal_code.as_deref()?;
        if is_valid_postal_code(self.country_code.as_deref(), postal_code) {
            return None;
        }
        Some(format!("postalCode: invalid postal code {postal_code}"))
    }
}

/**
 * Sum of amounts for one calendar month, formatted `YYYY-MM`.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthAmount {
    pub month: String,
    pub total: Decimal,
}

/**
 * Formats the month of a date as `YYYY-MM`.
 */
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/**
 * Returns the first day of the month `months_back` months before the month of `today`.
 */
pub fn first_day_months_back(today: NaiveDate, months_back: u32) -> NaiveDate {
    let month_index = today.year() * 12 + i32::try_from(today.month0()).unwrap_or(0) - i32::try_from(months_back).unwrap_or(0);
    let year = month_index.div_euclid(12);
    let month = u32::try_from(month_index.rem_euclid(12)).unwrap_or(0) + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

/**
 * Builds a zero-filled series of the last `months` months ending with the month of `today`.
 *
 * # Arguments
 * `today`: The reference date.
 * `months`: Number of months in the series.
 * `sums`: Month keys with their totals, months missing here are reported as zero.
 *
 * # Returns
 * The series in chronological order.
 */
pub fn fill_month_series(today: NaiveDate, months: u32, sums: &[(String, Decimal)]) -> Vec<MonthAmount> {
    (0..months)
        .rev()
        .map(|back| {
            let month = month_key(first_day_months_back(today, back));
            let total = sums.iter().filter(|(key, _)| *key == month).map(|(_, amount)| *amount).sum();
            MonthAmount { month, total }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let pagination = PaginationInput::new(None, None).validate().unwrap();
        assert_eq!(pagination.start_index, 0);
        assert_eq!(pagination.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_invalid() {
        assert!(PaginationInput::new(Some(-1), None).validate().is_err());
        assert!(PaginationInput::new(None, Some(0)).validate().is_err());
        assert!(PaginationInput::new(None, Some(MAX_PAGE_SIZE + 1)).validate().is_err());
    }

    #[test]
    fn test_first_day_months_back_crosses_year() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 17).unwrap();
        assert_eq!(first_day_months_back(today, 0), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(first_day_months_back(today, 2), NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(first_day_months_back(today, 14), NaiveDate::from_ymd_opt(2022, 12, 1).unwrap());
    }

    #[test]
    fn test_fill_month_series() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 17).unwrap();
        let sums = vec![("2024-01".to_string(), Decimal::new(1250, 2)), ("2023-12".to_string(), Decimal::new(300, 0))];
        let series = fill_month_series(today, 4, &sums);
        assert_eq!(series.len(), 4);
        assert_eq!(series[0], MonthAmount { month: "2023-11".to_string(), total: Decimal::ZERO });
        assert_eq!(series[1], MonthAmount { month: "2023-12".to_string(), total: Decimal::new(300, 0) });
        assert_eq!(series[2], MonthAmount { month: "2024-01".to_string(), total: Decimal::new(1250, 2) });
        assert_eq!(series[3], MonthAmount { month: "2024-02".to_string(), total: Decimal::ZERO });
    }

    #[test]
    fn test_address_postal_code() {
        let mut address = FullAddress { country_code: Some("IT".to_string()), postal_code: Some("00184".to_string()), ..FullAddress::default() };
        assert!(address.postal_code_error().is_none());
        address.postal_code = Some("0018".to_string());
        assert!(address.postal_code_error().is_some());
        address.country_code = Some("DE".to_string());
        assert!(address.postal_code_error().is_none());
    }
}
