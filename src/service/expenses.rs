use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{debug, info, instrument};

use crate::{
    dao::{documents::DocumentDao, employees::EmployeeDao, expenses::ExpenseDao, projects::ProjectDao, suppliers::SupplierDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        documents::StorageLocation,
        enums::{DocumentOwnerType, ExpenseStatus},
        models::{ListOutputType, PaginationInput},
        personnel::{ExpenseItemInputType, ExpenseReportDetailType, ExpenseReportInputType, ExpenseReportListInputType, ExpenseReportWithItemsType, ExpenseTotals},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, finish, today},
        storage::FileStorage,
    },
};

/**
 * Base of the next report number, e.g. `004/2024/`.
 *
 * # Arguments
 * `report_count`: Number of existing reports.
 * `year`: Current year.
 */
pub fn next_report_number_base(report_count: i64, year: i32) -> String {
    format!("{:03}/{year}/", report_count + 1)
}

/**
 * Sequential number in the first three characters of a report number, 0 when there is none.
 */
pub fn sequential_number(report_number: &str) -> i32 {
    report_number.get(..3).and_then(|prefix| prefix.parse().ok()).unwrap_or(0)
}

/**
 * New number of a report after the report with `removed_number` was deleted.
 *
 * # Returns
 * The number shifted down by one, or `None` when the report keeps its number.
 */
pub fn renumbered(report_number: &str, removed_number: i32) -> Option<String> {
    let current = sequential_number(report_number);
    if current > removed_number {
        let suffix = report_number.get(3..).unwrap_or_default();
        Some(format!("{:03}{suffix}", current - 1))
    } else {
        None
    }
}

/**
 * Ids of the existing items a report update drops.
 *
 * # Arguments
 * `existing_ids`: Ids of the items currently stored for the report.
 * `items`: The submitted items. Items with an id must be among `existing_ids`.
 *
 * # Returns
 * The existing ids not submitted again, or not found for an id of another report.
 */
pub fn removed_item_ids(existing_ids: &[i64], items: &[ExpenseItemInputType]) -> Result<Vec<i64>, ApplicationError> {
    if let Some(unknown_id) = items.iter().filter_map(|item| item.id).find(|id| !existing_ids.contains(id)) {
        return Err(ApplicationError::new(ErrorType::NotFound, format!("Expense item {unknown_id} not found in report")));
    }
    Ok(existing_ids.iter().copied().filter(|id| !items.iter().any(|item| item.id == Some(*id))).collect())
}

/**
 * Status and final approval date after toggling the approval of a report.
 */
pub fn toggled_approval(status: ExpenseStatus, today: NaiveDate) -> (ExpenseStatus, Option<NaiveDate>) {
    match status {
        ExpenseStatus::Approved => (ExpenseStatus::Draft, None),
        _ => (ExpenseStatus::Approved, Some(today)),
    }
}

/**
 * Service for expense reports and their items.
 */
pub struct ExpenseService {
    expense_dao: ExpenseDao,
    employee_dao: EmployeeDao,
    project_dao: ProjectDao,
    supplier_dao: SupplierDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl ExpenseService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        ExpenseService {
            expense_dao: ExpenseDao::new(),
            employee_dao: EmployeeDao::new(),
            project_dao: ProjectDao::new(),
            supplier_dao: SupplierDao::new(),
            document_dao: DocumentDao::new(),
            file_storage,
            connection_pool,
        }
    }

    /**
     * Retrieves a report with its items.
     */
    pub async fn get_expense_report(&self, report_id: i64) -> Result<ExpenseReportWithItemsType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.get_expense_report_in(&mut connection, report_id).await
    }

    async fn get_expense_report_in(&self, connection: &mut PgConnection, report_id: i64) -> Result<ExpenseReportWithItemsType, ApplicationError> {
        let report = self.expense_dao.get_expense_report(connection, report_id).await?;
        let items = self.expense_dao.get_expense_items(connection, report_id).await?;
        Ok(ExpenseReportWithItemsType { report, items })
    }

    pub async fn get_expense_report_list(&self, pagination_input: PaginationInput, filter: ExpenseReportListInputType) -> Result<ListOutputType<ExpenseReportDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.expense_dao.get_expense_report_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Base for the number of the next report.
     */
    pub async fn get_next_report_number_base(&self) -> Result<String, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let report_count = self.expense_dao.count_expense_reports(&mut connection).await?;
        Ok(next_report_number_base(report_count, today().year()))
    }

    /**
     * Creates a draft report with its items. Totals are computed from the items.
     *
     * # Arguments
     * `report_input`: The report with at least one item.
     *
     * # Returns
     * The stored report with its items.
     */
    #[instrument(skip(self, report_input), fields(employee_id = report_input.employee_id))]
    pub async fn add_expense_report(&self, report_input: ExpenseReportInputType) -> Result<ExpenseReportWithItemsType, ApplicationError> {
        let report_input = report_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.add_expense_report_in(&mut transaction, report_input, today()).await;
        finish(transaction, result).await
    }

    async fn add_expense_report_in(&self, transaction: &mut PgConnection, report_input: ExpenseReportInputType, today: NaiveDate) -> Result<ExpenseReportWithItemsType, ApplicationError> {
        self.check_references(transaction, &report_input).await?;
        let report_number = match &report_input.report_number {
            Some(report_number) => report_number.clone(),
            None => next_report_number_base(self.expense_dao.count_expense_reports(transaction).await?, today.year()),
        };
        let totals = ExpenseTotals::compute(&report_input.items, report_input.reimbursable_total);
        let creation_date = report_input.creation_date.unwrap_or(today);
        let report_id = self.expense_dao.add_expense_report(transaction, &report_number, creation_date, ExpenseStatus::Draft, &report_input, &totals).await?;
        for item in report_input.items {
            self.expense_dao.add_expense_item(transaction, report_id, item).await?;
        }
        info!("Expense report {report_number} created");
        self.get_expense_report_in(transaction, report_id).await
    }

    /**
     * Updates a report and its items. Submitted items with an id are updated in place, items
     * without an id are added and stored items left out are removed with their documents.
     */
    #[instrument(skip(self, report_input))]
    pub async fn update_expense_report(&self, report_id: i64, report_input: ExpenseReportInputType) -> Result<ExpenseReportWithItemsType, ApplicationError> {
        let report_input = report_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_expense_report_in(&mut transaction, report_id, report_input).await;
        let (report, removed_items, storage_paths) = finish(transaction, result).await?;
        self.delete_item_files(&removed_items, &storage_paths).await;
        Ok(report)
    }

    async fn update_expense_report_in(
        &self,
        transaction: &mut PgConnection,
        report_id: i64,
        report_input: ExpenseReportInputType,
    ) -> Result<(ExpenseReportWithItemsType, Vec<i64>, Vec<String>), ApplicationError> {
        let existing = self.expense_dao.get_expense_report(transaction, report_id).await?;
        self.check_references(transaction, &report_input).await?;
        let report_number = report_input.report_number.clone().unwrap_or(existing.report_number);
        let status = report_input.status.unwrap_or(existing.status);
        let totals = ExpenseTotals::compute(&report_input.items, report_input.reimbursable_total);
        self.expense_dao.update_expense_report(transaction, report_id, &report_number, status, &report_input, &totals).await?;
        let existing_ids: Vec<i64> = self.expense_dao.get_expense_items(transaction, report_id).await?.into_iter().map(|item| item.id).collect();
        let removed_items = removed_item_ids(&existing_ids, &report_input.items)?;
        let storage_paths = self.document_dao.delete_documents_for_owners(transaction, DocumentOwnerType::ExpenseItem, &removed_items).await?;
        self.expense_dao.delete_expense_item_list(transaction, report_id, &removed_items).await?;
        for item in report_input.items {
            match item.id {
                Some(item_id) => self.expense_dao.update_expense_item(transaction, report_id, item_id, item).await?,
                None => {
                    self.expense_dao.add_expense_item(transaction, report_id, item).await?;
                }
            }
        }
        debug!("Expense report {report_id} updated, {} items removed", removed_items.len());
        let report = self.get_expense_report_in(transaction, report_id).await?;
        Ok((report, removed_items, storage_paths))
    }

    /**
     * Switches a report between approved and draft.
     */
    #[instrument(skip(self))]
    pub async fn toggle_approval(&self, report_id: i64) -> Result<ExpenseReportWithItemsType, ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.toggle_approval_in(&mut transaction, report_id, today()).await;
        finish(transaction, result).await
    }

    async fn toggle_approval_in(&self, transaction: &mut PgConnection, report_id: i64, today: NaiveDate) -> Result<ExpenseReportWithItemsType, ApplicationError> {
        let existing = self.expense_dao.get_expense_report(transaction, report_id).await?;
        let (status, final_approval_date) = toggled_approval(existing.status, today);
        self.expense_dao.update_expense_report_approval(transaction, report_id, status, final_approval_date).await?;
        debug!("Expense report {report_id} is now {status:?}");
        self.get_expense_report_in(transaction, report_id).await
    }

    /**
     * Deletes a report with its items and their documents. Every report with a higher
     * sequential number, of any employee and year, is renumbered down by one.
     */
    #[instrument(skip(self))]
    pub async fn delete_expense_report(&self, report_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_expense_report_in(&mut transaction, report_id).await;
        let (removed_items, storage_paths) = finish(transaction, result).await?;
        self.delete_item_files(&removed_items, &storage_paths).await;
        Ok(())
    }

    /**
     * Deletes a report within an open transaction.
     *
     * # Returns
     * Ids of the deleted items and the storage paths of their documents.
     */
    pub async fn delete_expense_report_in(&self, transaction: &mut PgConnection, report_id: i64) -> Result<(Vec<i64>, Vec<String>), ApplicationError> {
        let existing = self.expense_dao.get_expense_report(transaction, report_id).await?;
        let removed_items = self.expense_dao.delete_expense_items(transaction, report_id).await?;
        let storage_paths = self.document_dao.delete_documents_for_owners(transaction, DocumentOwnerType::ExpenseItem, &removed_items).await?;
        self.expense_dao.delete_expense_report(transaction, report_id).await?;
        let removed_number = sequential_number(&existing.report_number);
        for (id, report_number) in self.expense_dao.get_expense_report_numbers(transaction).await? {
            if let Some(report_number) = renumbered(&report_number, removed_number) {
                self.expense_dao.update_expense_report_number(transaction, id, &report_number).await?;
            }
        }
        Ok((removed_items, storage_paths))
    }

    /**
     * Removes the files and directories of deleted items.
     */
    pub async fn delete_item_files(&self, removed_items: &[i64], storage_paths: &[String]) {
        self.file_storage.delete_files(storage_paths).await;
        for item_id in removed_items {
            self.file_storage.delete_directory(&StorageLocation::ExpenseItem(*item_id).directory()).await;
        }
    }

    async fn check_references(&self, connection: &mut PgConnection, report_input: &ExpenseReportInputType) -> Result<(), ApplicationError> {
        check_reference(self.employee_dao.employee_exists(connection, report_input.employee_id).await?, "Employee", report_input.employee_id)?;
        if let Some(project_id) = report_input.project_id {
            check_reference(self.project_dao.project_exists(connection, project_id).await?, "Project", project_id)?;
        }
        for item in &report_input.items {
            if let Some(supplier_id) = item.supplier_id {
                check_reference(self.supplier_dao.supplier_exists(connection, supplier_id).await?, "Supplier", supplier_id)?;
            }
            if let Some(project_id) = item.project_id {
                check_reference(self.project_dao.project_exists(connection, project_id).await?, "Project", project_id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_next_report_number_base() {
        assert_eq!(next_report_number_base(0, 2024), "001/2024/");
        assert_eq!(next_report_number_base(41, 2025), "042/2025/");
    }

    #[test]
    fn test_sequential_number() {
        assert_eq!(sequential_number("007/2024/ROSSI"), 7);
        assert_eq!(sequential_number("12"), 0);
        assert_eq!(sequential_number("ABC/2024"), 0);
    }

    #[test]
    fn test_renumbered() {
        assert_eq!(renumbered("005/2024/ROSSI", 3), Some("004/2024/ROSSI".to_string()));
        assert_eq!(renumbered("003/2024/", 3), None);
        assert_eq!(renumbered("002/2024/", 3), None);
        assert_eq!(renumbered("", 0), None);
    }

    fn item(id: Option<i64>) -> ExpenseItemInputType {
        ExpenseItemInputType { id, expense_date: None, description: "Taxi".to_string(), amount: None, invoice_number: None, supplier_id: None, project_id: None, note: None }
    }

    #[test]
    fn test_removed_item_ids() {
        assert_eq!(removed_item_ids(&[1, 2, 3], &[item(Some(2)), item(None)]).unwrap(), vec![1, 3]);
        assert_eq!(removed_item_ids(&[1, 2], &[item(Some(1)), item(Some(2))]).unwrap(), Vec::<i64>::new());
        assert_eq!(removed_item_ids(&[], &[item(None)]).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_removed_item_ids_unknown_item() {
        let error = removed_item_ids(&[1, 2], &[item(Some(9))]).unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
    }

    #[test]
    fn test_toggled_approval() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        assert_eq!(toggled_approval(ExpenseStatus::Draft, today), (ExpenseStatus::Approved, Some(today)));
        assert_eq!(toggled_approval(ExpenseStatus::Submitted, today), (ExpenseStatus::Approved, Some(today)));
        assert_eq!(toggled_approval(ExpenseStatus::Approved, today), (ExpenseStatus::Draft, None));
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::common::integration_test::init_db,
        model::{documents::DocumentUploadInputType, enums::DocumentType},
        service::{
            common::integration_test::{add_test_employee, pdf_file, test_storage},
            documents::DocumentService,
        },
    };
    use rust_decimal::Decimal;

    fn item(id: Option<i64>, description: &str) -> ExpenseItemInputType {
        ExpenseItemInputType { id, expense_date: None, description: description.to_string(), amount: Some(Decimal::new(1500, 2)), invoice_number: None, supplier_id: None, project_id: None, note: None }
    }

    fn report_input(employee_id: i64, report_number: Option<&str>, items: Vec<ExpenseItemInputType>) -> ExpenseReportInputType {
        ExpenseReportInputType {
            report_number: report_number.map(str::to_string),
            employee_id,
            purpose: Some("Trasferta".to_string()),
            creation_date: None,
            submit_date: None,
            start_date: None,
            end_date: None,
            reimbursable_total: None,
            project_id: None,
            payment_method: None,
            status: None,
            items,
        }
    }

    fn receipt(item_id: i64) -> DocumentUploadInputType {
        DocumentUploadInputType { owner_type: DocumentOwnerType::ExpenseItem, owner_id: item_id, document_type: DocumentType::Receipt, issue_date: None, expiry_date: None }
    }

    #[sqlx::test]
    async fn test_update_keeps_documents_of_remaining_items() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let file_storage = test_storage(directory.path());
        let expense_service = ExpenseService::new(file_storage.clone(), Some(pool.clone()));
        let document_service = DocumentService::new(file_storage.clone(), 30, Some(pool.clone()));
        let employee_id = add_test_employee(&pool).await;
        let report = expense_service.add_expense_report(report_input(employee_id, None, vec![item(None, "Taxi"), item(None, "Hotel")])).await.unwrap();
        let kept_id = report.items[0].id;
        let dropped_id = report.items[1].id;
        let kept_document = document_service.upload_document(receipt(kept_id), pdf_file("taxi.pdf")).await.unwrap();
        let dropped_document = document_service.upload_document(receipt(dropped_id), pdf_file("hotel.pdf")).await.unwrap();

        let updated = expense_service
            .update_expense_report(report.report.id, report_input(employee_id, Some(&report.report.report_number), vec![item(Some(kept_id), "Taxi aeroporto"), item(None, "Pranzo")]))
            .await
            .unwrap();

        assert_eq!(updated.items.len(), 2);
        let kept = updated.items.iter().find(|item| item.id == kept_id).unwrap();
        assert_eq!(kept.description, "Taxi aeroporto");
        assert!(updated.items.iter().all(|item| item.id != dropped_id));
        assert_eq!(updated.report.total, Decimal::new(3000, 2));
        assert_eq!(document_service.get_document(kept_document.id).await.unwrap().storage_path, kept_document.storage_path);
        assert!(file_storage.read(&kept_document.storage_path).await.is_ok());
        assert_eq!(document_service.get_document(dropped_document.id).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(file_storage.read(&dropped_document.storage_path).await.unwrap_err().error_type, ErrorType::NotFound);
        assert!(!directory.path().join(StorageLocation::ExpenseItem(dropped_id).directory()).exists());
    }

    #[sqlx::test]
    async fn test_update_with_item_of_another_report() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let expense_service = ExpenseService::new(test_storage(directory.path()), Some(pool.clone()));
        let employee_id = add_test_employee(&pool).await;
        let first = expense_service.add_expense_report(report_input(employee_id, None, vec![item(None, "Taxi")])).await.unwrap();
        let second = expense_service.add_expense_report(report_input(employee_id, None, vec![item(None, "Hotel")])).await.unwrap();
        let error = expense_service.update_expense_report(first.report.id, report_input(employee_id, None, vec![item(Some(second.items[0].id), "Hotel")])).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert_eq!(expense_service.get_expense_report(second.report.id).await.unwrap().items[0].description, "Hotel");
    }

    #[sqlx::test]
    async fn test_missing_item_supplier_is_not_found() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let expense_service = ExpenseService::new(test_storage(directory.path()), Some(pool.clone()));
        let employee_id = add_test_employee(&pool).await;
        let with_supplier = ExpenseItemInputType { supplier_id: Some(i64::MAX), ..item(None, "Carburante") };
        let error = expense_service.add_expense_report(report_input(employee_id, None, vec![with_supplier])).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert!(error.message.starts_with("Supplier"));
    }

    #[sqlx::test]
    async fn test_delete_renumbers_later_reports() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let expense_service = ExpenseService::new(test_storage(directory.path()), Some(pool.clone()));
        let employee_id = add_test_employee(&pool).await;
        let other_employee_id = add_test_employee(&pool).await;
        let first = expense_service.add_expense_report(report_input(employee_id, Some("901/2099/A"), vec![item(None, "Taxi")])).await.unwrap();
        let second = expense_service.add_expense_report(report_input(employee_id, Some("902/2099/B"), vec![item(None, "Hotel")])).await.unwrap();
        let third = expense_service.add_expense_report(report_input(other_employee_id, Some("903/2098/C"), vec![item(None, "Treno")])).await.unwrap();

        expense_service.delete_expense_report(second.report.id).await.unwrap();

        assert_eq!(expense_service.get_expense_report(second.report.id).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(expense_service.get_expense_report(first.report.id).await.unwrap().report.report_number, "901/2099/A");
        assert_eq!(expense_service.get_expense_report(third.report.id).await.unwrap().report.report_number, "902/2098/C");
    }
}
