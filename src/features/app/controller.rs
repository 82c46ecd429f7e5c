/// アプリケーションコントローラー
///
/// 認証ゲートとデータクライアントを受け取り、画面全体の状態を管理する。
/// 状態の変更はすべて `&mut self` のメソッドで順番に行う。セッション変更通知は
/// 任意のスレッドから届くためチャネルに積み、コントローラーが取り出して反映する。
use super::state::{AppPhase, AppState, Modal};
use crate::features::auth::{AuthChange, AuthError, AuthGate, SessionSubscription, User};
use crate::features::subscriptions::{
    delete_intent, Confirm, FormController, ListIntent, Subscription, SubscriptionListView,
    SubscriptionStore, SIGN_OUT_CONFIRMATION_MESSAGE,
};
use crate::shared::errors::{AppError, AppResult, ErrorSeverity};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub struct AppController<S, A> {
    store: S,
    auth: A,
    state: AppState,
    events_tx: UnboundedSender<AuthChange>,
    events_rx: UnboundedReceiver<AuthChange>,
    subscription: Option<SessionSubscription>,
}

impl<S, A> AppController<S, A>
where
    S: SubscriptionStore,
    A: AuthGate,
{
    /// 新しいAppControllerを作成する
    ///
    /// # 引数
    /// * `store` - データクライアント
    /// * `auth` - 認証ゲート
    pub fn new(store: S, auth: A) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            store,
            auth,
            state: AppState::default(),
            events_tx,
            events_rx,
            subscription: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// 一覧と合計の表示内容
    pub fn view(&self) -> SubscriptionListView {
        self.state.list_view()
    }

    /// 起動処理
    ///
    /// セッション変更の購読を開始し、現在のセッションに応じて画面を決める。
    pub async fn mount(&mut self) {
        if self.subscription.is_none() {
            let sender = self.events_tx.clone();
            self.subscription = Some(self.auth.on_session_change(move |change| {
                if sender.send(change.clone()).is_err() {
                    log::debug!("コントローラー破棄後のセッション変更通知を無視しました");
                }
            }));
        }

        match self.auth.current_session().await {
            Ok(Some(session)) => self.enter_authenticated(session.user).await,
            Ok(None) => self.enter_unauthenticated(),
            Err(e) => {
                log::error!("セッションの確認に失敗しました: {e}");
                self.state.notice = Some(e.user_message().to_string());
                self.enter_unauthenticated();
            }
        }
    }

    /// 受信済みのセッション変更をすべて反映する
    ///
    /// # 戻り値
    /// 反映した通知の件数
    pub async fn process_session_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(change) = self.events_rx.try_recv() {
            self.apply_session_change(change).await;
            processed += 1;
        }
        processed
    }

    /// 次のセッション変更を待って反映する
    pub async fn next_session_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(change) => {
                self.apply_session_change(change).await;
                true
            }
            None => false,
        }
    }

    async fn apply_session_change(&mut self, change: AuthChange) {
        log::debug!("セッション変更を反映します: event={:?}", change.event);
        match change.session {
            Some(session) => self.enter_authenticated(session.user).await,
            None => self.enter_unauthenticated(),
        }
    }

    async fn enter_authenticated(&mut self, user: User) {
        log::info!("一覧画面に切り替えます: user_id={}", user.id);
        self.state.phase = AppPhase::Authenticated;
        self.state.user = Some(user);
        self.state.sign_in_error = None;
        self.reload().await;
    }

    fn enter_unauthenticated(&mut self) {
        if self.state.phase == AppPhase::Authenticated {
            log::info!("サインイン画面に切り替えます");
        }
        self.state.phase = AppPhase::Unauthenticated;
        self.state.user = None;
        self.state.subscriptions.clear();
        self.state.modal = Modal::Closed;
    }

    /// 保存先エラーを記録し、画面に反映する
    ///
    /// 認証エラーの場合はセッションの更新を一度だけ試み、更新できなければ
    /// サインアウトしてサインイン画面に戻す。
    async fn handle_store_error(&mut self, action: &str, error: &AppError) {
        match error.severity() {
            ErrorSeverity::High | ErrorSeverity::Critical => {
                log::error!("{action}に失敗しました: {error}")
            }
            ErrorSeverity::Low | ErrorSeverity::Medium => {
                log::warn!("{action}に失敗しました: {error}")
            }
        }
        self.state.notice = Some(error.user_message().to_string());

        if error.is_unauthorized() {
            self.recover_session().await;
        }
    }

    async fn recover_session(&mut self) {
        match self.auth.refresh_session().await {
            Ok(Some(session)) => {
                log::info!("セッションを更新しました: user_id={}", session.user_id());
                self.state.user = Some(session.user);
                return;
            }
            Ok(None) => log::info!("セッションを更新できないためサインアウトします"),
            Err(e) => log::warn!("セッションの更新に失敗しました: {e}"),
        }

        if let Err(e) = self.auth.sign_out().await {
            log::warn!("期限切れセッションの破棄に失敗しました: {e}");
        }
        self.enter_unauthenticated();
    }

    /// 一覧を再取得する
    pub async fn reload(&mut self) {
        if self.state.phase != AppPhase::Authenticated {
            return;
        }

        match self.store.list().await {
            Ok(subscriptions) => {
                self.state.subscriptions = subscriptions;
            }
            Err(e) => self.handle_store_error("一覧の取得", &e).await,
        }
    }

    /// 新規登録フォームを開く
    pub fn open_create(&mut self) {
        if !self.state.is_authenticated() {
            return;
        }
        self.state.modal = Modal::Open(FormController::create());
    }

    /// 編集フォームを開く
    ///
    /// # 戻り値
    /// 一覧に該当IDがあって開けた場合はtrue
    pub fn open_edit(&mut self, id: &str) -> bool {
        match self.state.find(id).cloned() {
            Some(subscription) if self.state.is_authenticated() => {
                self.open_edit_record(subscription);
                true
            }
            _ => false,
        }
    }

    fn open_edit_record(&mut self, subscription: Subscription) {
        self.state.modal = Modal::Open(FormController::edit(subscription));
    }

    /// 開いているフォーム
    pub fn form_mut(&mut self) -> Option<&mut FormController> {
        match &mut self.state.modal {
            Modal::Open(form) => Some(form),
            Modal::Closed => None,
        }
    }

    /// フォームを閉じる（何も送信しない）
    pub fn close_modal(&mut self) {
        self.state.modal = Modal::Closed;
    }

    /// フォームを送信する
    ///
    /// 検証に失敗した場合は保存先を呼ばない。保存に成功した場合のみ一覧に反映して
    /// モーダルを閉じる。失敗した場合はモーダルを開いたまま一覧を変更しない。
    pub async fn submit(&mut self) -> AppResult<()> {
        let Modal::Open(form) = &mut self.state.modal else {
            return Err(AppError::validation("フォームが開かれていません"));
        };

        let data = form
            .submit()
            .map_err(|errors| AppError::validation(errors.to_string()))?;
        let editing_id = form.editing().map(|subscription| subscription.id.clone());

        let result = match &editing_id {
            Some(id) => self.store.update(id, data.into()).await,
            None => self.store.create(data).await,
        };

        match result {
            Ok(saved) => {
                match editing_id {
                    Some(id) => {
                        if let Some(slot) = self
                            .state
                            .subscriptions
                            .iter_mut()
                            .find(|subscription| subscription.id == id)
                        {
                            *slot = saved;
                        }
                    }
                    None => self.state.subscriptions.insert(0, saved),
                }
                self.state.modal = Modal::Closed;
                self.state.notice = None;
                Ok(())
            }
            Err(e) => {
                let action = if editing_id.is_some() { "更新" } else { "作成" };
                self.handle_store_error(action, &e).await;
                Err(e)
            }
        }
    }

    /// 確認の上でレコードを削除する
    ///
    /// # 戻り値
    /// 削除した場合はtrue、確認で取り消された場合はfalse
    pub async fn delete(&mut self, id: &str, confirm: &impl Confirm) -> AppResult<bool> {
        let subscription = self
            .state
            .find(id)
            .cloned()
            .ok_or_else(|| AppError::not_found("サブスクリプション"))?;

        match delete_intent(&subscription, confirm) {
            Some(intent) => self.apply_intent(intent).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// 一覧の行に対する操作を実行する
    pub async fn apply_intent(&mut self, intent: ListIntent) -> AppResult<()> {
        match intent {
            ListIntent::Edit(subscription) => {
                self.open_edit_record(subscription);
                Ok(())
            }
            ListIntent::Delete(id) => match self.store.delete(&id).await {
                Ok(()) => {
                    self.state
                        .subscriptions
                        .retain(|subscription| subscription.id != id);
                    self.state.notice = None;
                    Ok(())
                }
                Err(e) => {
                    self.handle_store_error("削除", &e).await;
                    Err(e)
                }
            },
        }
    }

    /// サインインする
    ///
    /// 失敗した場合はサインインフォームにエラーを表示する。
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        match self.auth.sign_in(email, password).await {
            Ok(_) => {
                self.state.sign_in_error = None;
                self.process_session_events().await;
                Ok(())
            }
            Err(e) => {
                log::warn!("サインインに失敗しました: {e}");
                self.state.sign_in_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// 確認の上でサインアウトする
    ///
    /// # 戻り値
    /// サインアウトした場合はtrue、確認で取り消された場合はfalse
    pub async fn sign_out(&mut self, confirm: &impl Confirm) -> Result<bool, AuthError> {
        if !confirm.confirm(SIGN_OUT_CONFIRMATION_MESSAGE) {
            log::debug!("サインアウトがキャンセルされました");
            return Ok(false);
        }

        let result = self.auth.sign_out().await;
        if let Err(e) = &result {
            log::error!("サインアウトに失敗しました: {e}");
            self.state.notice = Some(e.user_message());
        }
        self.process_session_events().await;
        self.enter_unauthenticated();
        result.map(|_| true)
    }

    /// セッション変更の購読を解除する
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            log::debug!("アプリケーションコントローラーを終了しました");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::{
        AuthEvent, LocalAuthGate, Session, SessionObservable,
    };
    use crate::features::subscriptions::{
        LocalSubscriptionStore, SubscriptionFormData, SubscriptionPatch,
    };
    use crate::shared::config::environment::LocalConfig;
    use crate::shared::database::create_in_memory_connection;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Failure {
        Store,
        Unauthorized,
    }

    impl Failure {
        fn error(self) -> AppError {
            match self {
                Failure::Store => AppError::store("connection reset"),
                Failure::Unauthorized => AppError::unauthorized("token expired"),
            }
        }
    }

    /// メモリ上のデータクライアント
    #[derive(Clone, Default)]
    struct FakeStore {
        records: Arc<Mutex<Vec<Subscription>>>,
        failure: Arc<Mutex<Option<Failure>>>,
        calls: Arc<AtomicUsize>,
        next_id: Arc<AtomicUsize>,
    }

    impl FakeStore {
        fn with_records(records: Vec<Subscription>) -> Self {
            let store = Self::default();
            *store.records.lock().unwrap() = records;
            store
        }

        fn fail_with(&self, failure: Option<Failure>) {
            *self.failure.lock().unwrap() = failure;
        }

        fn check(&self) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match *self.failure.lock().unwrap() {
                Some(failure) => Err(failure.error()),
                None => Ok(()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SubscriptionStore for FakeStore {
        async fn list(&self) -> AppResult<Vec<Subscription>> {
            self.check()?;
            Ok(self.records.lock().unwrap().clone())
        }

        async fn create(&self, data: SubscriptionFormData) -> AppResult<Subscription> {
            self.check()?;
            let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let created = Subscription {
                id,
                user_id: "user-1".to_string(),
                name: data.name,
                monthly_price: data.monthly_price,
                start_date: data.start_date,
                memo: data.memo,
                created_at: "2024-01-02T00:00:00.000+09:00".to_string(),
                updated_at: "2024-01-02T00:00:00.000+09:00".to_string(),
            };
            self.records.lock().unwrap().insert(0, created.clone());
            Ok(created)
        }

        async fn update(&self, id: &str, patch: SubscriptionPatch) -> AppResult<Subscription> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let slot = records
                .iter_mut()
                .find(|record| record.id == id)
                .ok_or_else(|| AppError::not_found("サブスクリプション"))?;
            *slot = patch.apply_to(slot);
            Ok(slot.clone())
        }

        async fn delete(&self, id: &str) -> AppResult<()> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|record| record.id != id);
            if records.len() == before {
                return Err(AppError::not_found("サブスクリプション"));
            }
            Ok(())
        }
    }

    /// 共有セッションを操作するだけの認証ゲート
    #[derive(Clone, Default)]
    struct FakeAuth {
        session: SessionObservable,
        refreshable: Arc<AtomicBool>,
    }

    impl AuthGate for FakeAuth {
        async fn current_session(&self) -> AppResult<Option<Session>> {
            Ok(self.session.current())
        }

        fn on_session_change<F>(&self, handler: F) -> SessionSubscription
        where
            F: Fn(&AuthChange) + Send + Sync + 'static,
        {
            self.session.subscribe(handler)
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
            crate::features::auth::validate_credentials(email, password)?;
            if password != "secret" {
                return Err(AuthError::InvalidCredentials(
                    "メールアドレスまたはパスワードが正しくありません".to_string(),
                ));
            }
            let session = session_for(email);
            self.session.publish(AuthEvent::SignedIn, Some(session.clone()));
            Ok(session)
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            self.session.publish(AuthEvent::SignedOut, None);
            Ok(())
        }

        async fn refresh_session(&self) -> Result<Option<Session>, AuthError> {
            let Some(current) = self.session.current() else {
                return Ok(None);
            };
            if !self.refreshable.load(Ordering::SeqCst) {
                return Ok(None);
            }
            let refreshed = Session {
                access_token: "refreshed".to_string(),
                ..current
            };
            self.session
                .publish(AuthEvent::TokenRefreshed, Some(refreshed.clone()));
            Ok(Some(refreshed))
        }
    }

    fn session_for(email: &str) -> Session {
        Session {
            user: User {
                id: "user-1".to_string(),
                email: email.to_string(),
            },
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
        }
    }

    fn record(id: &str, name: &str, price: f64) -> Subscription {
        Subscription {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            name: name.to_string(),
            monthly_price: price,
            start_date: "2024-01-01".to_string(),
            memo: None,
            created_at: "2024-01-01T00:00:00.000+09:00".to_string(),
            updated_at: "2024-01-01T00:00:00.000+09:00".to_string(),
        }
    }

    async fn mounted(records: Vec<Subscription>) -> (AppController<FakeStore, FakeAuth>, FakeStore, FakeAuth) {
        let store = FakeStore::with_records(records);
        let auth = FakeAuth::default();
        auth.session.restore(Some(session_for("user@example.com")));

        let mut controller = AppController::new(store.clone(), auth.clone());
        controller.mount().await;
        (controller, store, auth)
    }

    fn ids(controller: &AppController<FakeStore, FakeAuth>) -> Vec<String> {
        controller
            .state()
            .subscriptions
            .iter()
            .map(|subscription| subscription.id.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_mount_without_session() {
        let store = FakeStore::default();
        let mut controller = AppController::new(store.clone(), FakeAuth::default());
        assert!(controller.state().is_loading());

        controller.mount().await;
        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_mount_with_session_loads_list() {
        let (controller, store, _auth) =
            mounted(vec![record("2", "Spotify", 980.0), record("1", "Netflix", 1500.0)]).await;

        assert!(controller.state().is_authenticated());
        assert_eq!(ids(&controller), vec!["2", "1"]);
        assert_eq!(controller.view().total_label, "¥2,480");
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_round_trip() {
        let (mut controller, _store, _auth) = mounted(vec![record("1", "Spotify", 980.0)]).await;

        controller.open_create();
        let form = controller.form_mut().unwrap();
        form.set_name("Netflix");
        form.set_monthly_price("1500");
        form.select_start_date(
            &chrono::DateTime::parse_from_rfc3339("2024-01-01T09:00:00+09:00").unwrap(),
        );

        controller.submit().await.unwrap();

        let netflix: Vec<&Subscription> = controller
            .state()
            .subscriptions
            .iter()
            .filter(|subscription| subscription.name == "Netflix")
            .collect();
        assert_eq!(netflix.len(), 1);
        assert_eq!(netflix[0].monthly_price, 1500.0);
        assert_eq!(netflix[0].start_date, "2024-01-01");
        assert_eq!(controller.state().subscriptions[0].name, "Netflix");
        assert!(!controller.state().is_modal_open());
    }

    #[tokio::test]
    async fn test_edit_round_trip_replaces_in_place() {
        let (mut controller, _store, _auth) = mounted(vec![
            record("x", "Hulu", 1026.0),
            record("abc", "Netflix", 1490.0),
            record("y", "Spotify", 980.0),
        ])
        .await;

        assert!(controller.open_edit("abc"));
        assert_eq!(controller.state().editing().unwrap().id, "abc");
        controller.form_mut().unwrap().set_monthly_price("1980");
        controller.submit().await.unwrap();

        assert_eq!(ids(&controller), vec!["x", "abc", "y"]);
        assert_eq!(controller.state().find("abc").unwrap().monthly_price, 1980.0);
        assert!(!controller.state().is_modal_open());
    }

    #[tokio::test]
    async fn test_edit_intent_opens_prefilled_form() {
        let (mut controller, _store, _auth) = mounted(vec![record("abc", "Netflix", 1490.0)]).await;
        let target = controller.state().subscriptions[0].clone();

        controller
            .apply_intent(crate::features::subscriptions::edit_intent(&target))
            .await
            .unwrap();
        let form = controller.state().form().unwrap();
        assert_eq!(form.draft().name, "Netflix");
        assert_eq!(form.submit_label(), "更新");
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (mut controller, store, _auth) = mounted(vec![
            record("x", "Hulu", 1026.0),
            record("abc", "Netflix", 1490.0),
        ])
        .await;
        let calls_before = store.calls();

        let deleted = controller.delete("abc", &|_: &str| false).await.unwrap();
        assert!(!deleted);
        assert_eq!(ids(&controller), vec!["x", "abc"]);
        assert_eq!(store.calls(), calls_before);

        let deleted = controller.delete("abc", &|_: &str| true).await.unwrap();
        assert!(deleted);
        assert_eq!(ids(&controller), vec!["x"]);
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_list_unchanged() {
        let (mut controller, store, _auth) = mounted(vec![record("abc", "Netflix", 1490.0)]).await;
        store.fail_with(Some(Failure::Store));

        let result = controller.delete("abc", &|_: &str| true).await;
        assert!(matches!(result, Err(AppError::Store(_))));
        assert_eq!(ids(&controller), vec!["abc"]);
        assert!(controller.state().notice.is_some());
    }

    #[tokio::test]
    async fn test_validation_failure_never_reaches_store() {
        let (mut controller, store, _auth) = mounted(vec![]).await;
        let calls_before = store.calls();

        controller.open_create();
        controller.form_mut().unwrap().set_monthly_price("-1");
        let result = controller.submit().await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.calls(), calls_before);
        assert!(controller.state().is_modal_open());
        assert_eq!(controller.state().form().unwrap().errors().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_keeps_modal_open() {
        let (mut controller, store, _auth) = mounted(vec![record("1", "Spotify", 980.0)]).await;
        store.fail_with(Some(Failure::Store));

        controller.open_create();
        let form = controller.form_mut().unwrap();
        form.set_name("Netflix");
        form.set_monthly_price("1500");

        assert!(controller.submit().await.is_err());
        assert!(controller.state().is_modal_open());
        assert_eq!(ids(&controller), vec!["1"]);
        assert_eq!(
            controller.state().notice.as_deref(),
            Some("データの保存先との通信でエラーが発生しました")
        );
        assert!(controller.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_unauthorized_forces_sign_in_view() {
        let (mut controller, store, auth) = mounted(vec![record("1", "Spotify", 980.0)]).await;
        store.fail_with(Some(Failure::Unauthorized));

        controller.reload().await;
        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);
        assert!(controller.state().subscriptions.is_empty());
        // 期限切れのセッションはゲート側からも破棄される
        assert!(auth.session.current().is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_session_once() {
        let (mut controller, store, auth) = mounted(vec![record("1", "Spotify", 980.0)]).await;
        auth.refreshable.store(true, Ordering::SeqCst);
        store.fail_with(Some(Failure::Unauthorized));

        controller.reload().await;
        assert!(controller.state().is_authenticated());
        assert_eq!(ids(&controller), vec!["1"]);
        assert_eq!(auth.session.current().unwrap().access_token, "refreshed");

        // 更新通知を反映すると一覧を取り直す
        store.fail_with(None);
        let calls_before = store.calls();
        assert_eq!(controller.process_session_events().await, 1);
        assert!(controller.state().is_authenticated());
        assert_eq!(store.calls(), calls_before + 1);
    }

    #[tokio::test]
    async fn test_unauthorized_delete_signs_out_when_refresh_fails() {
        let (mut controller, store, auth) = mounted(vec![record("abc", "Netflix", 1490.0)]).await;
        store.fail_with(Some(Failure::Unauthorized));

        let result = controller.delete("abc", &|_: &str| true).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);
        assert!(auth.session.current().is_none());

        // 破棄時の通知を反映しても状態は変わらない
        controller.process_session_events().await;
        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn test_session_loss_clears_list() {
        let (mut controller, _store, auth) = mounted(vec![record("1", "Spotify", 980.0)]).await;
        controller.open_create();

        auth.session.publish(AuthEvent::SignedOut, None);
        assert_eq!(controller.process_session_events().await, 1);

        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);
        assert!(controller.state().subscriptions.is_empty());
        assert!(!controller.state().is_modal_open());
        assert!(controller.state().user.is_none());
    }

    #[tokio::test]
    async fn test_session_event_from_other_thread() {
        let store = FakeStore::with_records(vec![record("1", "Spotify", 980.0)]);
        let auth = FakeAuth::default();
        let mut controller = AppController::new(store, auth.clone());
        controller.mount().await;
        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);

        let session = auth.session.clone();
        std::thread::spawn(move || {
            session.publish(AuthEvent::SignedIn, Some(session_for("user@example.com")));
        })
        .join()
        .unwrap();

        assert!(controller.next_session_event().await);
        assert!(controller.state().is_authenticated());
        assert_eq!(ids(&controller), vec!["1"]);
    }

    #[tokio::test]
    async fn test_sign_in_and_sign_out() {
        let store = FakeStore::with_records(vec![record("1", "Spotify", 980.0)]);
        let mut controller = AppController::new(store, FakeAuth::default());
        controller.mount().await;

        let err = controller.sign_in("user@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        assert!(controller.state().sign_in_error.is_some());
        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);

        controller.sign_in("user@example.com", "secret").await.unwrap();
        assert!(controller.state().is_authenticated());
        assert!(controller.state().sign_in_error.is_none());
        assert_eq!(ids(&controller), vec!["1"]);

        let asked = std::cell::RefCell::new(Vec::new());
        let confirm = |message: &str| {
            asked.borrow_mut().push(message.to_string());
            true
        };
        assert!(controller.sign_out(&confirm).await.unwrap());
        assert_eq!(
            *asked.borrow(),
            vec![crate::features::subscriptions::SIGN_OUT_CONFIRMATION_MESSAGE.to_string()]
        );
        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);
        assert!(controller.state().subscriptions.is_empty());
    }

    #[tokio::test]
    async fn test_declined_sign_out_keeps_session() {
        let (mut controller, _store, auth) = mounted(vec![record("1", "Spotify", 980.0)]).await;

        assert!(!controller.sign_out(&|_: &str| false).await.unwrap());
        assert_eq!(controller.state().phase, AppPhase::Authenticated);
        assert_eq!(ids(&controller), vec!["1"]);
        assert!(auth.session.current().is_some());
        assert_eq!(controller.process_session_events().await, 0);
    }

    #[tokio::test]
    async fn test_teardown_releases_subscription() {
        let (mut controller, _store, auth) = mounted(vec![]).await;
        assert_eq!(auth.session.listener_count(), 1);

        controller.teardown();
        assert_eq!(auth.session.listener_count(), 0);

        // 二回目は何もしない
        controller.teardown();
    }

    #[tokio::test]
    async fn test_local_stack_end_to_end() {
        let conn = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
        let session = SessionObservable::new();
        let config = LocalConfig {
            data_dir: PathBuf::from("/tmp"),
            email: "user@example.com".to_string(),
            password: "secret".to_string(),
        };
        let auth = LocalAuthGate::new(Arc::clone(&conn), session.clone(), &config);
        let store = LocalSubscriptionStore::new(conn, session);

        let mut controller = AppController::new(store, auth);
        controller.mount().await;
        assert_eq!(controller.state().phase, AppPhase::Unauthenticated);

        controller.sign_in("user@example.com", "secret").await.unwrap();
        assert!(controller.state().is_authenticated());

        for (name, price) in [("Netflix", "1500"), ("Spotify", "980")] {
            controller.open_create();
            let form = controller.form_mut().unwrap();
            form.set_name(name);
            form.set_monthly_price(price);
            controller.submit().await.unwrap();
        }
        assert_eq!(controller.view().total_label, "¥2,480");

        // 再取得しても作成順の逆順で並ぶ
        controller.reload().await;
        let names: Vec<&str> = controller
            .state()
            .subscriptions
            .iter()
            .map(|subscription| subscription.name.as_str())
            .collect();
        assert_eq!(names, vec!["Spotify", "Netflix"]);

        controller.teardown();
    }
}
