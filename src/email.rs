use crate::AppMode;
use chrono::{Duration, Utc};
use resend_rs::types::CreateEmailBaseOptions;
use resend_rs::{Resend, Result};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Unknown Email error")]
    UnknownError,
    #[error("Resend API key not found")]
    ApiKeyNotFound,
}

const WELCOME_EMAIL_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Welcome to Reelflow</title>
    <style>
        body { font-family: ui-sans-serif,system-ui,sans-serif; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        h1, h2, h3 { font-weight: 300; }
        .features { background-color: rgba(0,0,0,0.05); padding: 15px; border-radius: 5px; margin-bottom: 20px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Welcome to <a href="https://reelflow.app">Reelflow</a>!</h1>
        <p>We're thrilled to have you join us.</p>

        <p>Reelflow keeps your whole video pipeline in one place, from the first rough cut to the final delivery.</p>

        <div class="features">
            <h3>What you can do today</h3>
            <ul>
                <li><strong>Projects:</strong> Plan work, assign tasks, and track progress with your team.</li>
                <li><strong>Review:</strong> Leave timestamped comments on any cut and vote on what ships.</li>
                <li><strong>Versions:</strong> Keep every cut, thumbnail, and short organized per video.</li>
            </ul>
        </div>

        <p>Create a company workspace to bring your editors and producers in, or join one you've been invited to.</p>

        <p>Your feedback is incredibly valuable. If you encounter any issues or have suggestions, please reach out to us at <a href="mailto:support@reelflow.app">support@reelflow.app</a>.</p>

        <p>Best regards,<br>The Reelflow Team</p>
    </div>
</body>
</html>
"#;

pub async fn send_welcome_email(
    app_mode: AppMode,
    resend_api_key: Option<String>,
    to_email: String,
) -> Result<(), EmailError> {
    tracing::debug!("Entering send_welcome_email");

    if resend_api_key.is_none() {
        return Err(EmailError::ApiKeyNotFound);
    }
    let api_key = resend_api_key.expect("just checked");

    let resend = Resend::new(&api_key);

    let to = [to_email];
    let from_email = from_reelflow_email(app_mode);
    let subject = "Welcome to Reelflow!";

    // Schedule the email to be sent 5 minutes from now
    let scheduled_time = Utc::now() + Duration::minutes(5);
    let scheduled_at = scheduled_time.to_rfc3339();

    let email = CreateEmailBaseOptions::new(from_email, to, subject)
        .with_html(WELCOME_EMAIL_HTML)
        .with_scheduled_at(&scheduled_at);

    let _email = resend.emails.send(email).await.map_err(|e| {
        tracing::error!("Failed to send email: {}", e);
        EmailError::UnknownError
    });

    tracing::debug!("Exiting send_welcome_email");
    Ok(())
}

pub async fn send_invitation_email(
    app_mode: AppMode,
    resend_api_key: Option<String>,
    to_email: String,
    company_name: String,
    invite_token: String,
) -> Result<(), EmailError> {
    tracing::debug!("Entering send_invitation_email");

    if resend_api_key.is_none() {
        return Err(EmailError::ApiKeyNotFound);
    }
    let api_key = resend_api_key.expect("just checked");

    let resend = Resend::new(&api_key);

    let from = from_reelflow_email(app_mode.clone());
    let to = [to_email];
    let subject = format!("You've been invited to join {} on Reelflow", company_name);

    let invite_url = format!("{}/join/{}", app_mode.frontend_url(), invite_token);

    let html_content = format!(
        r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta name="viewport" content="width=device-width, initial-scale=1.0">
            <title>Team Invitation - Reelflow</title>
            <style>
                body {{ font-family: ui-sans-serif,system-ui,sans-serif; }}
                .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
                h1, h2, h3 {{ font-weight: 300; }}
                .button {{ display: inline-block; padding: 10px 20px; background-color: black; color: #ffffff; text-decoration: none; border-radius: 5px; }}
                .code {{ background-color: rgba(1,1,1,0.05); padding: 10px; border-radius: 5px; font-family: monospace; font-size: 16px; }}
            </style>
        </head>
        <body>
            <div class="container">
                <h1>You've Been Invited!</h1>
                <p>You've been invited to join the {} team on Reelflow. To accept this invitation, please click the button below:</p>
                <p>
                    <a href="{}" class="button">Accept Invitation</a>
                </p>
                <p>If the button doesn't work, you can copy and paste the following link into your browser:</p>
                <p>{}</p>
                <p>Alternatively, you can use the following invitation code:</p>
                <p class="code">{}</p>
                <p>This invitation link and code will expire in 7 days.</p>
                <p>If you weren't expecting this invitation, you can safely ignore this email.</p>
                <p>Best regards,<br>The Reelflow Team</p>
            </div>
        </body>
        </html>
        "#,
        company_name, invite_url, invite_url, invite_token
    );

    let email = CreateEmailBaseOptions::new(from, to, subject).with_html(&html_content);

    let _email = resend.emails.send(email).await.map_err(|e| {
        tracing::error!("Failed to send email: {}", e);
        EmailError::UnknownError
    });

    tracing::debug!("Exiting send_invitation_email");
    Ok(())
}

pub async fn send_password_reset_email(
    app_mode: AppMode,
    resend_api_key: Option<String>,
    to_email: String,
    reset_token: String,
) -> Result<(), EmailError> {
    tracing::debug!("Entering send_password_reset_email");

    if resend_api_key.is_none() {
        return Err(EmailError::ApiKeyNotFound);
    }
    let api_key = resend_api_key.expect("just checked");

    let resend = Resend::new(&api_key);

    let from = from_reelflow_email(app_mode.clone());
    let to = [to_email];
    let subject = "Reset Your Reelflow Password";

    let reset_url = format!("{}/password/reset?token={}", app_mode.frontend_url(), reset_token);

    let html_content = format!(
        r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta name="viewport" content="width=device-width, initial-scale=1.0">
            <title>Reset Your Reelflow Password</title>
            <style>
                body {{ font-family: ui-sans-serif,system-ui,sans-serif; }}
                .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
                h1, h2, h3 {{ font-weight: 300; }}
                .button {{ display: inline-block; padding: 10px 20px; background-color: black; color: #ffffff; text-decoration: none; border-radius: 5px; }}
                .code {{ background-color: rgba(1,1,1,0.05); padding: 10px; border-radius: 5px; font-family: monospace; font-size: 16px; }}
            </style>
        </head>
        <body>
            <div class="container">
                <h1>Reset Your Reelflow Password</h1>
                <p>We received a request to reset your Reelflow account password. If you didn't make this request, you can ignore this email.</p>
                <p>To reset your password, click the button below:</p>
                <p>
                    <a href="{}" class="button">Reset Password</a>
                </p>
                <p>If the button doesn't work, you can copy and paste the following link into your browser:</p>
                <p>{}</p>
                <p>Alternatively, you can use the following reset code:</p>
                <p class="code">{}</p>
                <p>This link and code will expire in 1 hour.</p>
                <p>If you have any issues, please contact our support team.</p>
                <p>Best regards,<br>The Reelflow Team</p>
            </div>
        </body>
        </html>
        "#,
        reset_url, reset_url, reset_token
    );

    let email = CreateEmailBaseOptions::new(from, to, subject).with_html(&html_content);

    let _email = resend.emails.send(email).await.map_err(|e| {
        tracing::error!("Failed to send email: {}", e);
        EmailError::UnknownError
    });

    tracing::debug!("Exiting send_password_reset_email");
    Ok(())
}

pub async fn send_password_reset_confirmation_email(
    app_mode: AppMode,
    resend_api_key: Option<String>,
    to_email: String,
) -> Result<(), EmailError> {
    tracing::debug!("Entering send_password_reset_confirmation_email");

    if resend_api_key.is_none() {
        return Err(EmailError::ApiKeyNotFound);
    }
    let api_key = resend_api_key.expect("just checked");

    let resend = Resend::new(&api_key);

    let from = from_reelflow_email(app_mode);
    let to = [to_email];
    let subject = "Your Reelflow Password Has Been Reset";

    let html_content = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta name="viewport" content="width=device-width, initial-scale=1.0">
            <title>Password Reset Confirmation</title>
            <style>
                body { font-family: ui-sans-serif,system-ui,sans-serif; }
                .container { max-width: 600px; margin: 0 auto; padding: 20px; }
                h1, h2, h3 { font-weight: 300; }
            </style>
        </head>
        <body>
            <div class="container">
                <h1>Password Reset Confirmation</h1>
                <p>Your Reelflow account password has been successfully reset.</p>
                <p>If you did not initiate this password reset, please contact us immediately at <a href="mailto:support@reelflow.app">support@reelflow.app</a>.</p>
                <p>For security reasons, we recommend that you:</p>
                <ul>
                    <li>Change your password again if you suspect any unauthorized access.</li>
                    <li>Review your account activity for any suspicious actions.</li>
                </ul>
                <p>If you have any questions or concerns, please don't hesitate to reach out to our support team.</p>
                <p>Best regards,<br>The Reelflow Team</p>
            </div>
        </body>
        </html>
        "#;

    let email = CreateEmailBaseOptions::new(from, to, subject).with_html(html_content);

    let _email = resend.emails.send(email).await.map_err(|e| {
        tracing::error!("Failed to send email: {}", e);
        EmailError::UnknownError
    });

    tracing::debug!("Exiting send_password_reset_confirmation_email");
    Ok(())
}

fn from_reelflow_email(app_mode: AppMode) -> String {
    match app_mode {
        AppMode::Local => "local@email.reelflow.app".to_string(),
        AppMode::Dev => "dev@email.reelflow.app".to_string(),
        AppMode::Preview => "preview@email.reelflow.app".to_string(),
        AppMode::Prod => "hello@email.reelflow.app".to_string(),
        AppMode::Custom(_) => "preview@email.reelflow.app".to_string(),
    }
}
