use super::models::{Subscription, SubscriptionFormData, SubscriptionPatch};
use crate::shared::errors::AppError;
use crate::shared::utils::get_current_jst_timestamp;
use rusqlite::{params, Connection, Row};

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, name, monthly_price, start_date, memo, created_at, updated_at FROM subscriptions";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        monthly_price: row.get(3)?,
        start_date: row.get(4)?,
        memo: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// サブスクリプションを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `owner` - 所有者のユーザーID
/// * `id` - 採番済みのID
/// * `data` - 検証済みのフォームデータ
///
/// # 戻り値
/// 作成されたサブスクリプション、または失敗時はエラー
pub fn create(
    conn: &Connection,
    owner: &str,
    id: &str,
    data: &SubscriptionFormData,
) -> Result<Subscription, AppError> {
    let now = get_current_jst_timestamp();

    conn.execute(
        "INSERT INTO subscriptions (id, user_id, name, monthly_price, start_date, memo, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, owner, data.name, data.monthly_price, data.start_date, data.memo, now, now],
    )?;

    find_by_id(conn, owner, id)
}

/// IDでサブスクリプションを取得する（所有者で絞り込む）
///
/// # 引数
/// * `conn` - データベース接続
/// * `owner` - 所有者のユーザーID
/// * `id` - サブスクリプションID
///
/// # 戻り値
/// サブスクリプション、または存在しない場合はNotFound
pub fn find_by_id(conn: &Connection, owner: &str, id: &str) -> Result<Subscription, AppError> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1 AND user_id = ?2"),
        params![id, owner],
        map_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            AppError::NotFound(format!("ID {id} のサブスクリプションが見つかりません"))
        }
        other => AppError::from(other),
    })
}

/// 所有者のサブスクリプション一覧を新しい順に取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `owner` - 所有者のユーザーID
///
/// # 戻り値
/// サブスクリプションのリスト、または失敗時はエラー
pub fn find_all(conn: &Connection, owner: &str) -> Result<Vec<Subscription>, AppError> {
    // 同一ミリ秒の作成はIDの降順で並べる
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, CAST(id AS INTEGER) DESC, id DESC"
    ))?;
    let subscriptions = stmt.query_map(params![owner], map_row)?;

    subscriptions
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::from)
}

/// サブスクリプションを部分更新する
///
/// # 引数
/// * `conn` - データベース接続
/// * `owner` - 所有者のユーザーID
/// * `id` - サブスクリプションID
/// * `patch` - 変更するフィールド
///
/// # 戻り値
/// 更新されたサブスクリプション、または失敗時はエラー
pub fn update(
    conn: &Connection,
    owner: &str,
    id: &str,
    patch: &SubscriptionPatch,
) -> Result<Subscription, AppError> {
    let existing = find_by_id(conn, owner, id)?;
    if patch.is_empty() {
        return Ok(existing);
    }

    let merged = patch.apply_to(&existing);
    let now = get_current_jst_timestamp();

    conn.execute(
        "UPDATE subscriptions
         SET name = ?1, monthly_price = ?2, start_date = ?3, memo = ?4, updated_at = ?5
         WHERE id = ?6 AND user_id = ?7",
        params![
            merged.name,
            merged.monthly_price,
            merged.start_date,
            merged.memo,
            now,
            id,
            owner
        ],
    )?;

    find_by_id(conn, owner, id)
}

/// サブスクリプションを削除する
///
/// # 引数
/// * `conn` - データベース接続
/// * `owner` - 所有者のユーザーID
/// * `id` - サブスクリプションID
///
/// # 戻り値
/// 成功時はOk(())、該当レコードがない場合はNotFound
pub fn delete(conn: &Connection, owner: &str, id: &str) -> Result<(), AppError> {
    let rows_affected = conn.execute(
        "DELETE FROM subscriptions WHERE id = ?1 AND user_id = ?2",
        params![id, owner],
    )?;

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "ID {id} のサブスクリプションが見つかりません"
        )));
    }

    Ok(())
}
