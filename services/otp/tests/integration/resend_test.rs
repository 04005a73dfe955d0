use secrecy::SecretString;

use happytails_otp::error::OtpServiceError;
use happytails_otp::usecase::resend::{ResendOtpInput, ResendOtpUseCase};
use happytails_otp::usecase::verify::{VerifyOtpInput, VerifyOtpUseCase};

use crate::helpers::{MockMailer, MockOtpRepo, MockUserRepo, test_user, verified_user};

fn resend_usecase(
    users: &MockUserRepo,
    otps: &MockOtpRepo,
    mailer: &MockMailer,
) -> ResendOtpUseCase<MockUserRepo, MockOtpRepo, MockMailer> {
    ResendOtpUseCase {
        users: users.clone(),
        otps: otps.clone(),
        mailer: mailer.clone(),
    }
}

fn resend_input(email: &str) -> ResendOtpInput {
    ResendOtpInput {
        email: email.to_owned(),
    }
}

#[tokio::test]
async fn should_return_user_not_found_for_unknown_email() {
    let users = MockUserRepo::empty();
    let otps = MockOtpRepo::for_users(&users);
    let mailer = MockMailer::new();

    let result = resend_usecase(&users, &otps, &mailer)
        .execute(resend_input("nobody@x.com"))
        .await;

    assert!(
        matches!(result, Err(OtpServiceError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn should_reject_empty_email() {
    let users = MockUserRepo::empty();
    let otps = MockOtpRepo::for_users(&users);
    let mailer = MockMailer::new();

    let result = resend_usecase(&users, &otps, &mailer)
        .execute(resend_input(""))
        .await;

    assert!(
        matches!(result, Err(OtpServiceError::MissingFields)),
        "expected MissingFields, got {result:?}"
    );
}

#[tokio::test]
async fn should_refuse_verified_account() {
    let users = MockUserRepo::new(vec![verified_user("a@x.com")]);
    let otps = MockOtpRepo::for_users(&users);
    let mailer = MockMailer::new();

    let result = resend_usecase(&users, &otps, &mailer)
        .execute(resend_input("a@x.com"))
        .await;

    assert!(
        matches!(result, Err(OtpServiceError::AlreadyVerified)),
        "expected AlreadyVerified, got {result:?}"
    );
    assert!(otps.records().is_empty());
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn should_issue_and_mail_for_known_user() {
    let user = test_user("a@x.com");
    let users = MockUserRepo::new(vec![user.clone()]);
    let otps = MockOtpRepo::for_users(&users);
    let mailer = MockMailer::new();

    let output = resend_usecase(&users, &otps, &mailer)
        .execute(resend_input("a@x.com"))
        .await
        .unwrap();

    let records = otps.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, user.id);
    assert_eq!(records[0].id, output.issuance_id);
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn should_leave_one_record_and_only_latest_code_valid() {
    let users = MockUserRepo::new(vec![test_user("a@x.com")]);
    let otps = MockOtpRepo::for_users(&users);
    let mailer = MockMailer::new();
    let uc = resend_usecase(&users, &otps, &mailer);

    let first = uc.execute(resend_input("a@x.com")).await.unwrap();
    let first_code = mailer.last_code();
    let second = uc.execute(resend_input("a@x.com")).await.unwrap();
    let second_code = mailer.last_code();

    assert_ne!(first.issuance_id, second.issuance_id);
    assert_eq!(otps.records().len(), 1, "at most one live record per email");

    let verify = VerifyOtpUseCase { otps: otps.clone() };
    // Two random draws can coincide; only a differing old code must fail.
    if first_code != second_code {
        let stale = verify
            .execute(VerifyOtpInput {
                email: "a@x.com".to_owned(),
                code: SecretString::from(first_code),
            })
            .await;
        assert!(
            matches!(stale, Err(OtpServiceError::InvalidOtp)),
            "expected InvalidOtp for superseded code, got {stale:?}"
        );
    }

    let fresh = verify
        .execute(VerifyOtpInput {
            email: "a@x.com".to_owned(),
            code: SecretString::from(second_code),
        })
        .await
        .unwrap();
    assert!(fresh.verified);
    assert!(users.is_verified("a@x.com"));
}

#[tokio::test]
async fn should_surface_mail_failure() {
    let users = MockUserRepo::new(vec![test_user("a@x.com")]);
    let otps = MockOtpRepo::for_users(&users);
    let mailer = MockMailer::failing();

    let result = resend_usecase(&users, &otps, &mailer)
        .execute(resend_input("a@x.com"))
        .await;

    assert!(
        matches!(result, Err(OtpServiceError::MailDelivery(_))),
        "expected MailDelivery, got {result:?}"
    );
    assert!(otps.records().is_empty());
}
