/// セッションファイルモジュール
///
/// リモート認証で取得したセッションをJSONファイルに保存し、
/// 次回起動時に復元できるようにする。
use crate::features::auth::models::Session;
use crate::shared::errors::{AppError, AppResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// ファイルに保存する認証情報
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    session: Session,
    /// 最終保存日時（RFC3339形式）
    saved_at: String,
}

/// セッションファイル
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// 新しいSessionFileを作成する
    ///
    /// # 引数
    /// * `path` - セッションファイルのパス
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// セッションを保存する
    ///
    /// # 引数
    /// * `session` - 保存するセッション
    ///
    /// # 戻り値
    /// 処理結果
    pub fn save(&self, session: &Session) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredSession {
            session: session.clone(),
            saved_at: Utc::now().to_rfc3339(),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;

        log::info!("セッションを保存しました: user_id={}", session.user_id());
        Ok(())
    }

    /// セッションを読み込む
    ///
    /// 破損したファイルは削除してNoneを返す。
    ///
    /// # 戻り値
    /// 保存済みセッション（存在しない場合はNone）
    pub fn load(&self) -> AppResult<Option<Session>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::from(e)),
        };

        match serde_json::from_slice::<StoredSession>(&bytes) {
            Ok(stored) => {
                log::debug!(
                    "保存済みセッションを読み込みました: user_id={}, saved_at={}",
                    stored.session.user_id(),
                    stored.saved_at
                );
                Ok(Some(stored.session))
            }
            Err(e) => {
                log::warn!("セッションファイルが破損しているため削除します: {e}");
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// セッションファイルを削除する
    pub fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("セッションファイルを削除しました");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::from(e)),
        }
    }
}
