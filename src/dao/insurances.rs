use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        registry::{InsuranceDetailType, InsuranceInputType, InsuranceListInputType},
    },
};

const QUERY_INSURANCE: &str = "SELECT i.id, i.project_id, i.supplier_id, i.policy_number, i.policy_type, i.start_date, i.expiry_date, i.payment_date, i.guaranteed_amount, i.notes,
                                      s.name AS supplier_name, p.code AS project_code
                               FROM insurances i
                               LEFT JOIN suppliers s ON s.id = i.supplier_id
                               LEFT JOIN projects p ON p.id = i.project_id
                               WHERE i.id = $1";

const QUERY_INSURANCE_LIST: &str = "SELECT i.id, i.project_id, i.supplier_id, i.policy_number, i.policy_type, i.start_date, i.expiry_date, i.payment_date, i.guaranteed_amount,
                                           i.notes, s.name AS supplier_name, p.code AS project_code
                                    FROM insurances i
                                    LEFT JOIN suppliers s ON s.id = i.supplier_id
                                    LEFT JOIN projects p ON p.id = i.project_id
                                    WHERE ($1::bigint IS NULL OR i.project_id = $1) AND ($2::bigint IS NULL OR i.supplier_id = $2)
                                    ORDER BY i.expiry_date NULLS LAST, i.id
                                    LIMIT $3 OFFSET $4";

const QUERY_EXPIRING_INSURANCES: &str = "SELECT i.id, i.project_id, i.supplier_id, i.policy_number, i.policy_type, i.start_date, i.expiry_date, i.payment_date,
                                                i.guaranteed_amount, i.notes, s.name AS supplier_name, p.code AS project_code
                                         FROM insurances i
                                         LEFT JOIN suppliers s ON s.id = i.supplier_id
                                         LEFT JOIN projects p ON p.id = i.project_id
                                         WHERE i.expiry_date BETWEEN $1 AND $2
                                         ORDER BY i.expiry_date, i.id";

const ADD_INSURANCE: &str = "INSERT INTO insurances (project_id, supplier_id, policy_number, policy_type, start_date, expiry_date, payment_date, guaranteed_amount, notes)
                             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                             RETURNING id";

const UPDATE_INSURANCE: &str = "UPDATE insurances SET project_id = $1, supplier_id = $2, policy_number = $3, policy_type = $4, start_date = $5, expiry_date = $6,
                                                      payment_date = $7, guaranteed_amount = $8, notes = $9
                                WHERE id = $10";

const DELETE_INSURANCE: &str = "DELETE FROM insurances WHERE id = $1";

/**
 * DAO for insurance policy database operations.
 */
pub struct InsuranceDao {}

impl InsuranceDao {
    pub fn new() -> Self {
        InsuranceDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_insurance(&self, connection: &mut PgConnection, insurance_id: i64) -> Result<InsuranceDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let insurance: Option<InsuranceDetailType> = sqlx::query_as(QUERY_INSURANCE)
            .bind(insurance_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get insurance", &err))?;
        found(insurance, "Insurance", insurance_id)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_insurance_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: InsuranceListInputType) -> Result<ListOutputType<InsuranceDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<InsuranceDetailType> = sqlx::query_as(QUERY_INSURANCE_LIST)
            .bind(filter.project_id)
            .bind(filter.supplier_id)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get insurance list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Retrieves policies expiring between `from` and `to`, inclusive, soonest first.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_expiring_insurances(&self, connection: &mut PgConnection, from: NaiveDate, to: NaiveDate) -> Result<Vec<InsuranceDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_EXPIRING_INSURANCES)
            .bind(from)
            .bind(to)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get expiring insurances", &err))
    }

    #[instrument(skip(self, transaction, insurance_input), fields(result))]
    pub async fn add_insurance(&self, transaction: &mut PgConnection, insurance_input: InsuranceInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_INSURANCE)
            .bind(insurance_input.project_id)
            .bind(insurance_input.supplier_id)
            .bind(insurance_input.policy_number)
            .bind(insurance_input.policy_type)
            .bind(insurance_input.start_date)
            .bind(insurance_input.expiry_date)
            .bind(insurance_input.payment_date)
            .bind(insurance_input.guaranteed_amount)
            .bind(insurance_input.notes)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, insurance_input), fields(result))]
    pub async fn update_insurance(&self, transaction: &mut PgConnection, insurance_id: i64, insurance_input: InsuranceInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_INSURANCE)
            .bind(insurance_input.project_id)
            .bind(insurance_input.supplier_id)
            .bind(insurance_input.policy_number)
            .bind(insurance_input.policy_type)
            .bind(insurance_input.start_date)
            .bind(insurance_input.expiry_date)
            .bind(insurance_input.payment_date)
            .bind(insurance_input.guaranteed_amount)
            .bind(insurance_input.notes)
            .bind(insurance_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Insurance", insurance_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_insurance(&self, transaction: &mut PgConnection, insurance_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_INSURANCE)
            .bind(insurance_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Insurance", insurance_id, "deleted")
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::common::integration_test::init_db;

    fn insurance_input(expiry_date: Option<NaiveDate>) -> InsuranceInputType {
        InsuranceInputType {
            project_id: None,
            supplier_id: None,
            policy_number: "POL-TEST-1".to_string(),
            policy_type: "CAR".to_string(),
            start_date: None,
            expiry_date,
            payment_date: None,
            guaranteed_amount: None,
            notes: None,
        }
    }

    #[sqlx::test]
    async fn test_add_then_list_expiring() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let insurance_dao = InsuranceDao::new();
        let from = NaiveDate::from_ymd_opt(2031, 5, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2031, 5, 31).unwrap();
        let inside = insurance_dao.add_insurance(&mut transaction, insurance_input(NaiveDate::from_ymd_opt(2031, 5, 31))).await.unwrap();
        let outside = insurance_dao.add_insurance(&mut transaction, insurance_input(NaiveDate::from_ymd_opt(2031, 6, 1))).await.unwrap();
        let expiring = insurance_dao.get_expiring_insurances(&mut transaction, from, to).await.unwrap();
        assert!(expiring.iter().any(|insurance| insurance.id == inside));
        assert!(!expiring.iter().any(|insurance| insurance.id == outside));
        insurance_dao.update_insurance(&mut transaction, outside, insurance_input(None)).await.unwrap();
        assert!(insurance_dao.get_insurance(&mut transaction, outside).await.unwrap().expiry_date.is_none());
        assert!(insurance_dao.delete_insurance(&mut transaction, inside).await.is_ok());
        transaction.rollback().await.unwrap();
    }
}
