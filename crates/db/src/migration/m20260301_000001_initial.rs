//! Initial database migration.
//!
//! Creates the enum types, the four ledger tables, and the indexes the
//! engine relies on for idempotency and tenant-scoped lookups.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(FINANCIAL_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(FINANCIAL_AUDITS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM (
    'asset',
    'liability',
    'equity',
    'revenue',
    'expense'
);

CREATE TYPE entry_type AS ENUM (
    'debit',
    'credit'
);

CREATE TYPE transaction_type AS ENUM (
    'deposit',
    'withdrawal',
    'currency_buy',
    'currency_sell'
);

CREATE TYPE transaction_status AS ENUM (
    'pending',
    'processing',
    'completed',
    'failed',
    'cancelled',
    'refunded'
);

CREATE TYPE audit_severity AS ENUM (
    'low',
    'medium',
    'high',
    'critical'
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    customer_id UUID,
    account_number VARCHAR(32) NOT NULL,
    account_type account_type NOT NULL,
    name VARCHAR(255) NOT NULL,
    currency CHAR(3) NOT NULL,
    -- NUMERIC(26, 8) holds 18 integer digits next to the 8-digit fraction
    balance NUMERIC(26, 8) NOT NULL DEFAULT 0,
    available_balance NUMERIC(26, 8) NOT NULL DEFAULT 0,
    blocked_balance NUMERIC(26, 8) NOT NULL DEFAULT 0,
    version BIGINT NOT NULL DEFAULT 1,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_blocked_non_negative CHECK (blocked_balance >= 0)
);

CREATE UNIQUE INDEX idx_accounts_tenant_number
    ON accounts (tenant_id, account_number);

-- One wallet per customer and currency; system accounts carry a NULL
-- customer and are exempt.
CREATE UNIQUE INDEX idx_accounts_tenant_customer_currency
    ON accounts (tenant_id, customer_id, currency)
    WHERE customer_id IS NOT NULL;

CREATE INDEX idx_accounts_tenant_currency
    ON accounts (tenant_id, currency);
";

const FINANCIAL_TRANSACTIONS_SQL: &str = r"
CREATE TABLE financial_transactions (
    id UUID PRIMARY KEY,
    transaction_number VARCHAR(32) NOT NULL,
    tenant_id UUID NOT NULL,
    customer_id UUID NOT NULL,
    transaction_type transaction_type NOT NULL,
    from_currency CHAR(3) NOT NULL,
    to_currency CHAR(3) NOT NULL,
    source_amount NUMERIC(26, 8) NOT NULL,
    destination_amount NUMERIC(26, 8) NOT NULL,
    exchange_rate NUMERIC(26, 8) NOT NULL DEFAULT 1,
    fee_amount NUMERIC(26, 8) NOT NULL DEFAULT 0,
    fee_currency CHAR(3) NOT NULL,
    status transaction_status NOT NULL DEFAULT 'pending',
    reference VARCHAR(255),
    external_reference VARCHAR(255),
    description TEXT NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}',
    created_by UUID NOT NULL,
    processed_at TIMESTAMPTZ,
    failed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_source_amount_positive CHECK (source_amount > 0),
    CONSTRAINT chk_destination_amount_positive CHECK (destination_amount > 0),
    CONSTRAINT chk_fee_non_negative CHECK (fee_amount >= 0)
);

CREATE UNIQUE INDEX idx_transactions_tenant_number
    ON financial_transactions (tenant_id, transaction_number);

-- Idempotency indexes; NULL references are excluded.
CREATE UNIQUE INDEX idx_transactions_tenant_reference
    ON financial_transactions (tenant_id, reference)
    WHERE reference IS NOT NULL;

CREATE UNIQUE INDEX idx_transactions_tenant_external_reference
    ON financial_transactions (tenant_id, external_reference)
    WHERE external_reference IS NOT NULL;

CREATE INDEX idx_transactions_tenant_customer
    ON financial_transactions (tenant_id, customer_id, created_at DESC);

CREATE INDEX idx_transactions_tenant_status
    ON financial_transactions (tenant_id, status);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    entry_number INTEGER NOT NULL,
    transaction_id UUID NOT NULL REFERENCES financial_transactions(id),
    account_id UUID NOT NULL REFERENCES accounts(id),
    entry_type entry_type NOT NULL,
    amount NUMERIC(26, 8) NOT NULL,
    currency CHAR(3) NOT NULL,
    posting_date TIMESTAMPTZ NOT NULL,
    description TEXT NOT NULL,
    is_posted BOOLEAN NOT NULL DEFAULT TRUE,
    is_reversed BOOLEAN NOT NULL DEFAULT FALSE,
    reversed_by_entry_id UUID REFERENCES ledger_entries(id),
    tenant_id UUID NOT NULL,
    created_by UUID NOT NULL,

    CONSTRAINT chk_entry_amount_positive CHECK (amount > 0)
);

CREATE UNIQUE INDEX idx_entries_transaction_number
    ON ledger_entries (transaction_id, entry_number);

CREATE INDEX idx_entries_account
    ON ledger_entries (account_id, posting_date);

CREATE INDEX idx_entries_tenant
    ON ledger_entries (tenant_id);
";

const FINANCIAL_AUDITS_SQL: &str = r"
CREATE TABLE financial_audits (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    user_id UUID NOT NULL,
    action VARCHAR(64) NOT NULL,
    resource_type VARCHAR(64) NOT NULL,
    resource_id VARCHAR(64) NOT NULL,
    transaction_id UUID REFERENCES financial_transactions(id),
    description TEXT NOT NULL,
    old_values JSONB,
    new_values JSONB,
    metadata JSONB NOT NULL DEFAULT '{}',
    severity audit_severity NOT NULL DEFAULT 'low',
    event_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_audits_tenant_event_time
    ON financial_audits (tenant_id, event_time);

CREATE INDEX idx_audits_transaction
    ON financial_audits (transaction_id)
    WHERE transaction_id IS NOT NULL;
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS financial_audits CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS financial_transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP TYPE IF EXISTS audit_severity;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS entry_type;
DROP TYPE IF EXISTS account_type;
";
