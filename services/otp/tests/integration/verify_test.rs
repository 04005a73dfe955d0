use chrono::Duration;
use secrecy::SecretString;

use happytails_otp::domain::repository::OtpRepository;
use happytails_otp::domain::types::{OtpRecord, UserAccount};
use happytails_otp::error::OtpServiceError;
use happytails_otp::usecase::issue::{IssueOtpInput, issue_otp};
use happytails_otp::usecase::verify::{VerifyOtpInput, VerifyOtpOutput, VerifyOtpUseCase};

use crate::helpers::{
    InterleavedOtpRepo, MockMailer, MockOtpRepo, MockUserRepo, fresh_record, test_user, wrong_code,
};

struct Fixture {
    users: MockUserRepo,
    otps: MockOtpRepo,
    mailer: MockMailer,
}

impl Fixture {
    fn new(email: &str) -> Self {
        let users = MockUserRepo::new(vec![test_user(email)]);
        let otps = MockOtpRepo::for_users(&users);
        Self {
            users,
            otps,
            mailer: MockMailer::new(),
        }
    }

    /// Issue a code for `email` and return the plaintext that was mailed.
    async fn issue(&self, email: &str) -> String {
        let user_id = self.user().id;
        issue_otp(
            &self.otps,
            &self.mailer,
            IssueOtpInput {
                user_id,
                email: email.to_owned(),
            },
        )
        .await
        .unwrap();
        self.mailer.last_code()
    }

    /// Verify through a repo that stores `next` right after the lookup.
    async fn verify_interleaved(
        &self,
        email: &str,
        code: &str,
        next: OtpRecord,
    ) -> Result<VerifyOtpOutput, OtpServiceError> {
        let uc = VerifyOtpUseCase {
            otps: InterleavedOtpRepo::new(self.otps.clone(), next),
        };
        uc.execute(VerifyOtpInput {
            email: email.to_owned(),
            code: SecretString::from(code.to_owned()),
        })
        .await
    }

    fn user(&self) -> UserAccount {
        self.users.users.lock().unwrap()[0].clone()
    }

    async fn verify(&self, email: &str, code: &str) -> Result<bool, OtpServiceError> {
        let uc = VerifyOtpUseCase {
            otps: self.otps.clone(),
        };
        uc.execute(VerifyOtpInput {
            email: email.to_owned(),
            code: SecretString::from(code.to_owned()),
        })
        .await
        .map(|out| out.verified)
    }
}

#[tokio::test]
async fn should_reject_missing_fields() {
    let fx = Fixture::new("a@x.com");

    for (email, code) in [("", "4821"), ("a@x.com", ""), ("  ", "4821"), ("a@x.com", " ")] {
        let result = fx.verify(email, code).await;
        assert!(
            matches!(result, Err(OtpServiceError::MissingFields)),
            "expected MissingFields for ({email:?}, {code:?}), got {result:?}"
        );
    }
}

#[tokio::test]
async fn should_return_not_found_when_never_issued() {
    let fx = Fixture::new("a@x.com");

    let result = fx.verify("a@x.com", "4821").await;
    assert!(
        matches!(result, Err(OtpServiceError::OtpNotFound)),
        "expected OtpNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_verify_once_then_report_not_found() {
    let fx = Fixture::new("a@x.com");
    let code = fx.issue("a@x.com").await;
    fx.otps.age(Duration::seconds(10));

    assert!(fx.verify("a@x.com", &code).await.unwrap());
    assert!(fx.users.is_verified("a@x.com"));
    assert!(fx.otps.records().is_empty(), "record must be consumed");

    let again = fx.verify("a@x.com", &code).await;
    assert!(
        matches!(again, Err(OtpServiceError::OtpNotFound)),
        "expected OtpNotFound on reuse, got {again:?}"
    );
}

#[tokio::test]
async fn should_keep_record_after_wrong_code() {
    let fx = Fixture::new("a@x.com");
    let code = fx.issue("a@x.com").await;

    let result = fx.verify("a@x.com", &wrong_code(&code)).await;
    assert!(
        matches!(result, Err(OtpServiceError::InvalidOtp)),
        "expected InvalidOtp, got {result:?}"
    );
    assert_eq!(fx.otps.records().len(), 1, "record must survive a mismatch");
    assert!(!fx.users.is_verified("a@x.com"));

    assert!(fx.verify("a@x.com", &code).await.unwrap());
    assert!(fx.users.is_verified("a@x.com"));
}

#[tokio::test]
async fn should_expire_and_remove_record() {
    let fx = Fixture::new("b@x.com");
    let code = fx.issue("b@x.com").await;
    fx.otps.age(Duration::seconds(3601));

    let result = fx.verify("b@x.com", &code).await;
    assert!(
        matches!(result, Err(OtpServiceError::OtpExpired)),
        "expected OtpExpired, got {result:?}"
    );
    assert!(fx.otps.records().is_empty(), "expired record must be deleted");
    assert!(!fx.users.is_verified("b@x.com"));

    let again = fx.verify("b@x.com", &code).await;
    assert!(
        matches!(again, Err(OtpServiceError::OtpNotFound)),
        "expected OtpNotFound after expiry cleanup, got {again:?}"
    );
}

#[tokio::test]
async fn should_treat_email_as_case_sensitive() {
    let fx = Fixture::new("a@x.com");
    let code = fx.issue("a@x.com").await;

    let result = fx.verify("A@X.COM", &code).await;
    assert!(
        matches!(result, Err(OtpServiceError::OtpNotFound)),
        "expected OtpNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_keep_fresh_issuance_when_removing_expired_one() {
    let fx = Fixture::new("b@x.com");
    let stale_code = fx.issue("b@x.com").await;
    fx.otps.age(Duration::seconds(3601));
    let fresh = fresh_record(&fx.user(), "5555").await;

    let result = fx
        .verify_interleaved("b@x.com", &stale_code, fresh.clone())
        .await;
    assert!(
        matches!(result, Err(OtpServiceError::OtpExpired)),
        "expected OtpExpired, got {result:?}"
    );

    let remaining = fx.otps.records();
    assert_eq!(remaining.len(), 1, "fresh issuance must survive");
    assert_eq!(remaining[0].id, fresh.id);
    assert!(fx.verify("b@x.com", "5555").await.unwrap());
}

#[tokio::test]
async fn should_not_verify_when_record_replaced_before_consume() {
    let fx = Fixture::new("a@x.com");
    let code = fx.issue("a@x.com").await;
    let fresh = fresh_record(&fx.user(), &wrong_code(&code)).await;

    let result = fx.verify_interleaved("a@x.com", &code, fresh.clone()).await;
    assert!(
        matches!(result, Err(OtpServiceError::OtpNotFound)),
        "expected OtpNotFound after losing the race, got {result:?}"
    );
    assert!(!fx.users.is_verified("a@x.com"));

    let remaining = fx.otps.records();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, fresh.id, "replacement must not be consumed");
}

#[tokio::test]
async fn should_not_verify_twice_when_consumed_concurrently() {
    let fx = Fixture::new("a@x.com");
    let code = fx.issue("a@x.com").await;
    let record = fx.otps.records()[0].clone();

    // Another request consumes the issuance after this one has read it.
    assert!(fx.otps.consume_and_verify(&record).await.unwrap());

    let uc = VerifyOtpUseCase {
        otps: fx.otps.clone(),
    };
    let late = uc
        .execute(VerifyOtpInput {
            email: "a@x.com".to_owned(),
            code: SecretString::from(code),
        })
        .await;
    assert!(
        matches!(late, Err(OtpServiceError::OtpNotFound)),
        "expected OtpNotFound, got {late:?}"
    );
}
