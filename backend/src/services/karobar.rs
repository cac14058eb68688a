//! Karobar cash-account ledger service
//!
//! Postings lock the account row, move `current_balance` by the amount and
//! append a statement carrying the new balance. Deleting a statement marks it
//! DELETED and recomputes the account balance from all active statements.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    apply_posting, recompute_balance, validate_money_scale, validate_positive_amount,
    AccountStatus, CategoryType, EntryType, StatementAmount, StatementStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Karobar service
#[derive(Clone)]
pub struct KarobarService {
    db: PgPool,
}

/// Cash or bank account
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct KarobarAccount {
    pub id: i64,
    pub client_id: i64,
    pub bank_name: String,
    pub address: Option<String>,
    pub account_name: String,
    pub account_number: String,
    pub holder_name: String,
    pub contact: Option<String>,
    pub notes: Option<String>,
    pub opening_balance: Decimal,
    pub opening_balance_date: NaiveDate,
    pub current_balance: Decimal,
    #[sqlx(try_from = "String")]
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// Statement category
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct KarobarCategory {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub category_type: CategoryType,
    pub created_at: DateTime<Utc>,
}

/// Statement row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct KarobarStatement {
    pub id: i64,
    pub account_id: i64,
    pub category_id: i64,
    #[sqlx(try_from = "String")]
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_no: Option<String>,
    pub performed_by: i64,
    #[sqlx(try_from = "String")]
    pub status: StatementStatus,
    pub deleted_by: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for opening an account
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountInput {
    #[validate(length(min = 1, max = 255, message = "Bank name is required"))]
    pub bank_name: String,
    pub address: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Account name is required"))]
    pub account_name: String,
    #[validate(length(min = 1, max = 100, message = "Account number is required"))]
    pub account_number: String,
    #[validate(length(min = 1, max = 255, message = "Holder name is required"))]
    pub holder_name: String,
    pub contact: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub opening_balance: Decimal,
    pub opening_balance_date: Option<NaiveDate>,
}

/// Input for creating a category
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 100, message = "Category name is required"))]
    pub name: String,
    pub category_type: Option<CategoryType>,
}

/// Input for posting a transaction
#[derive(Debug, Deserialize, Validate)]
pub struct PostTransactionInput {
    pub account_id: i64,
    pub category_id: i64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub notes: Option<String>,
    #[validate(length(max = 100, message = "Reference number is too long"))]
    pub reference_no: Option<String>,
}

/// Input for deleting a statement
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteStatementInput {
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
}

/// Result of a posting
#[derive(Debug, Clone, Serialize)]
pub struct PostTransactionResult {
    pub statement_id: i64,
    pub balance: Decimal,
}

/// Result of a statement deletion
#[derive(Debug, Clone, Serialize)]
pub struct DeleteStatementResult {
    pub statement_id: i64,
    pub new_balance: Decimal,
}

#[derive(Debug, FromRow)]
struct LockedAccount {
    opening_balance: Decimal,
    current_balance: Decimal,
    #[sqlx(try_from = "String")]
    status: AccountStatus,
}

#[derive(Debug, FromRow)]
struct AmountRow {
    #[sqlx(try_from = "String")]
    entry_type: EntryType,
    #[sqlx(try_from = "String")]
    status: StatementStatus,
    amount: Decimal,
}

/// Categories every client starts with
pub const DEFAULT_CATEGORIES: &[(&str, CategoryType)] = &[
    ("Daily Saving", CategoryType::In),
    ("Monthly Deposit", CategoryType::In),
    ("Emergency Fund", CategoryType::In),
    ("Bank Transfer", CategoryType::Both),
    ("Expense Withdrawal", CategoryType::Out),
    ("Misc", CategoryType::Both),
];

const ACCOUNT_COLUMNS: &str = "id, client_id, bank_name, address, account_name, account_number, \
                               holder_name, contact, notes, opening_balance, \
                               opening_balance_date, current_balance, status, created_at";

const STATEMENT_COLUMNS: &str = "id, account_id, category_id, entry_type, amount, balance_after, \
                                 reason, notes, reference_no, performed_by, status, deleted_by, \
                                 deleted_at, delete_reason, created_at";

async fn lock_account(
    conn: &mut PgConnection,
    client_id: i64,
    account_id: i64,
) -> AppResult<LockedAccount> {
    sqlx::query_as::<_, LockedAccount>(
        r#"
        SELECT opening_balance, current_balance, status
        FROM sahakari_accounts
        WHERE id = $1 AND client_id = $2
        FOR UPDATE
        "#,
    )
    .bind(account_id)
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Account".to_string()))
}

impl KarobarService {
    /// Create a new KarobarService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open an account; its current balance starts at the opening balance
    #[tracing::instrument(skip(self, input))]
    pub async fn create_account(
        &self,
        client_id: i64,
        input: CreateAccountInput,
    ) -> AppResult<KarobarAccount> {
        input.validate()?;
        validate_money_scale(input.opening_balance)
            .map_err(|msg| AppError::validation("opening_balance", msg))?;

        let opening_date = input
            .opening_balance_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let account = sqlx::query_as::<_, KarobarAccount>(&format!(
            r#"
            INSERT INTO sahakari_accounts (client_id, bank_name, address, account_name,
                                           account_number, holder_name, contact, notes,
                                           opening_balance, opening_balance_date, current_balance)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $9)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(client_id)
        .bind(input.bank_name.trim())
        .bind(&input.address)
        .bind(input.account_name.trim())
        .bind(input.account_number.trim())
        .bind(input.holder_name.trim())
        .bind(&input.contact)
        .bind(&input.notes)
        .bind(input.opening_balance)
        .bind(opening_date)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            account_id = account.id,
            opening_balance = %account.opening_balance,
            "Account opened"
        );

        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, client_id: i64, account_id: i64) -> AppResult<KarobarAccount> {
        sqlx::query_as::<_, KarobarAccount>(&format!(
            "SELECT {} FROM sahakari_accounts WHERE id = $1 AND client_id = $2",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account".to_string()))
    }

    /// Change an account's status. Inactive accounts refuse new postings.
    pub async fn set_account_status(
        &self,
        client_id: i64,
        account_id: i64,
        status: AccountStatus,
    ) -> AppResult<KarobarAccount> {
        let result = sqlx::query(
            "UPDATE sahakari_accounts SET status = $1 WHERE id = $2 AND client_id = $3",
        )
        .bind(status.as_str())
        .bind(account_id)
        .bind(client_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account".to_string()));
        }

        self.get_account(client_id, account_id).await
    }

    /// Create a statement category
    #[tracing::instrument(skip(self, input))]
    pub async fn create_category(
        &self,
        client_id: i64,
        input: CreateCategoryInput,
    ) -> AppResult<KarobarCategory> {
        input.validate()?;
        let category_type = input.category_type.unwrap_or(CategoryType::Both);

        let category = sqlx::query_as::<_, KarobarCategory>(
            r#"
            INSERT INTO karobar_categories (client_id, name, category_type)
            VALUES ($1, $2, $3)
            RETURNING id, client_id, name, category_type, created_at
            "#,
        )
        .bind(client_id)
        .bind(input.name.trim())
        .bind(category_type.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(category)
    }

    /// Create the default categories a client does not have yet
    pub async fn seed_default_categories(&self, client_id: i64) -> AppResult<Vec<KarobarCategory>> {
        let mut tx = self.db.begin().await?;

        for (name, category_type) in DEFAULT_CATEGORIES {
            sqlx::query(
                r#"
                INSERT INTO karobar_categories (client_id, name, category_type)
                VALUES ($1, $2, $3)
                ON CONFLICT (client_id, name) DO NOTHING
                "#,
            )
            .bind(client_id)
            .bind(*name)
            .bind(category_type.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.list_categories(client_id).await
    }

    /// List a client's categories
    pub async fn list_categories(&self, client_id: i64) -> AppResult<Vec<KarobarCategory>> {
        let categories = sqlx::query_as::<_, KarobarCategory>(
            r#"
            SELECT id, client_id, name, category_type, created_at
            FROM karobar_categories
            WHERE client_id = $1
            ORDER BY name
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    /// Post an IN or OUT transaction to an account.
    ///
    /// The account row stays locked until commit, so concurrent postings to
    /// the same account see each other's balance. OUT postings beyond the
    /// balance are refused unless `privileged`.
    #[tracing::instrument(skip(self, input), fields(account_id = input.account_id, entry_type = %input.entry_type))]
    pub async fn post_transaction(
        &self,
        client_id: i64,
        user_id: i64,
        privileged: bool,
        input: PostTransactionInput,
    ) -> AppResult<PostTransactionResult> {
        input.validate()?;
        validate_positive_amount(input.amount)
            .and_then(|_| validate_money_scale(input.amount))
            .map_err(|msg| AppError::validation("amount", msg))?;

        let mut tx = self.db.begin().await?;

        let account = lock_account(&mut tx, client_id, input.account_id).await?;
        account.status.ensure_postable()?;

        let category_type = sqlx::query_scalar::<_, String>(
            "SELECT category_type FROM karobar_categories WHERE id = $1 AND client_id = $2",
        )
        .bind(input.category_id)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?
        .parse::<CategoryType>()?;

        if !category_type.admits(input.entry_type) {
            return Err(AppError::validation(
                "category_id",
                format!(
                    "Category only accepts {} entries",
                    category_type.as_str()
                ),
            ));
        }

        let balance = match apply_posting(
            account.current_balance,
            input.entry_type,
            input.amount,
            privileged,
        ) {
            Ok(balance) => balance,
            Err(err) => {
                tracing::warn!(
                    current_balance = %account.current_balance,
                    amount = %input.amount,
                    "Posting refused: {}",
                    err
                );
                return Err(err.into());
            }
        };

        sqlx::query("UPDATE sahakari_accounts SET current_balance = $1 WHERE id = $2")
            .bind(balance)
            .bind(input.account_id)
            .execute(&mut *tx)
            .await?;

        let statement_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO karobar_statements (client_id, account_id, category_id, entry_type, amount,
                                            balance_after, reason, notes, reference_no,
                                            performed_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(input.account_id)
        .bind(input.category_id)
        .bind(input.entry_type.as_str())
        .bind(input.amount)
        .bind(balance)
        .bind(&input.reason)
        .bind(&input.notes)
        .bind(&input.reference_no)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(statement_id, %balance, "Karobar transaction posted");

        Ok(PostTransactionResult {
            statement_id,
            balance,
        })
    }

    /// Soft-delete a statement and recompute its account balance.
    ///
    /// `balance_after` on other statements is left as it was posted.
    #[tracing::instrument(skip(self, input))]
    pub async fn delete_statement(
        &self,
        client_id: i64,
        user_id: i64,
        statement_id: i64,
        input: DeleteStatementInput,
    ) -> AppResult<DeleteStatementResult> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let account_id = sqlx::query_scalar::<_, i64>(
            "SELECT account_id FROM karobar_statements WHERE id = $1 AND client_id = $2",
        )
        .bind(statement_id)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Statement".to_string()))?;

        // Account first, then statement, in the same order as postings
        let account = lock_account(&mut tx, client_id, account_id).await?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM karobar_statements WHERE id = $1 FOR UPDATE",
        )
        .bind(statement_id)
        .fetch_one(&mut *tx)
        .await?;

        status.parse::<StatementStatus>()?.ensure_deletable()?;

        sqlx::query(
            r#"
            UPDATE karobar_statements
            SET status = 'DELETED', deleted_by = $1, deleted_at = NOW(), delete_reason = $2
            WHERE id = $3
            "#,
        )
        .bind(user_id)
        .bind(input.reason.trim())
        .bind(statement_id)
        .execute(&mut *tx)
        .await?;

        let new_balance = recompute_account(&mut tx, account_id, account.opening_balance).await?;

        tx.commit().await?;

        tracing::info!(
            statement_id,
            account_id,
            old_balance = %account.current_balance,
            %new_balance,
            "Karobar statement deleted"
        );

        Ok(DeleteStatementResult {
            statement_id,
            new_balance,
        })
    }

    /// Statements of an account, oldest first
    pub async fn list_statements(
        &self,
        client_id: i64,
        account_id: i64,
        include_deleted: bool,
    ) -> AppResult<Vec<KarobarStatement>> {
        self.get_account(client_id, account_id).await?;

        let statements = sqlx::query_as::<_, KarobarStatement>(&format!(
            r#"
            SELECT {}
            FROM karobar_statements
            WHERE account_id = $1 AND client_id = $2 AND ($3 OR status = 'ACTIVE')
            ORDER BY id
            "#,
            STATEMENT_COLUMNS
        ))
        .bind(account_id)
        .bind(client_id)
        .bind(include_deleted)
        .fetch_all(&self.db)
        .await?;

        Ok(statements)
    }
}

/// Recompute and store an account balance from its statements
async fn recompute_account(
    conn: &mut PgConnection,
    account_id: i64,
    opening_balance: Decimal,
) -> AppResult<Decimal> {
    let rows = sqlx::query_as::<_, AmountRow>(
        "SELECT entry_type, status, amount FROM karobar_statements WHERE account_id = $1",
    )
    .bind(account_id)
    .fetch_all(&mut *conn)
    .await?;

    let amounts: Vec<StatementAmount> = rows
        .into_iter()
        .map(|r| StatementAmount {
            entry_type: r.entry_type,
            status: r.status,
            amount: r.amount,
        })
        .collect();

    let balance = recompute_balance(opening_balance, &amounts);

    sqlx::query("UPDATE sahakari_accounts SET current_balance = $1 WHERE id = $2")
        .bind(balance)
        .bind(account_id)
        .execute(&mut *conn)
        .await?;

    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_categories_cover_both_directions() {
        let names: HashSet<&str> = DEFAULT_CATEGORIES.iter().map(|(n, _)| *n).collect();
        assert_eq!(names.len(), DEFAULT_CATEGORIES.len());
        assert!(DEFAULT_CATEGORIES
            .iter()
            .any(|(_, t)| t.admits(EntryType::In)));
        assert!(DEFAULT_CATEGORIES
            .iter()
            .any(|(_, t)| t.admits(EntryType::Out)));
    }
}
