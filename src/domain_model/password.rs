use rand::Rng;

/// Characters accepted as the "special" class, and the pool the generators
/// draw from.
const SPECIAL_CHARS: &str = "!@#$%^&*()-_=+[]{};:,.?";

/// Lowercase filler used when a first name is too short to anchor a
/// temporary password on its own.
const NAME_PAD: &str = "care";

const WORDLIST: &[&str] = &[
    "maple", "river", "sunny", "cedar", "amber", "birch", "coral", "delta",
    "ember", "fable", "grove", "haven", "ivory", "jolly", "lunar", "meadow",
    "noble", "ocean", "pearl", "quill", "ridge", "stone", "tulip", "willow",
];

#[derive(Debug, Clone)]
pub struct PasswordCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Evaluates the platform password policy and reports every violated rule,
/// not just the first.
pub fn validate_password(password: &str) -> PasswordCheck {
    let mut errors = Vec::new();

    if password.chars().count() < 8 {
        errors.push("must be at least 8 characters long".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("must contain an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("must contain a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("must contain a digit".to_string());
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        errors.push("must contain a special character".to_string());
    }

    PasswordCheck {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Human-rememberable password for admin-initiated resets: capitalized
/// first name, four digits, one special character. Deliberately lower
/// entropy than [`generate_secure_password`]; the account carries a forced
/// password change until the owner picks their own.
pub fn generate_temp_password(first_name: &str) -> String {
    let mut rng = rand::rng();

    let cleaned: String = first_name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    let mut name = match cleaned.chars().next() {
        Some(first) => {
            let rest: String = cleaned.chars().skip(1).collect::<String>().to_lowercase();
            format!("{}{}", first.to_ascii_uppercase(), rest)
        }
        None => "Guest".to_string(),
    };
    // The name anchors the uppercase and lowercase classes; pad short names
    // so the final string clears the length rule.
    while name.len() < 3 {
        name.push_str(NAME_PAD);
    }
    name.truncate(12);

    let digits: String = (0..4).map(|_| char::from(b'0' + rng.random_range(0..10))).collect();
    let special = pick_special(&mut rng);

    format!("{}{}{}", name, digits, special)
}

/// Higher-entropy three-word password for administrator resets of
/// privileged accounts: three capitalized words, two digits, one special
/// character.
pub fn generate_secure_password() -> String {
    let mut rng = rand::rng();

    let mut out = String::new();
    for _ in 0..3 {
        let word = WORDLIST[rng.random_range(0..WORDLIST.len())];
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    out.push(char::from(b'0' + rng.random_range(0..10)));
    out.push(char::from(b'0' + rng.random_range(0..10)));
    out.push(pick_special(&mut rng));

    out
}

fn pick_special(rng: &mut impl Rng) -> char {
    let bytes = SPECIAL_CHARS.as_bytes();
    char::from(bytes[rng.random_range(0..bytes.len())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_violated_rule() {
        let check = validate_password("abc");
        assert!(!check.is_valid);
        // length, uppercase, digit, special
        assert_eq!(check.errors.len(), 4);
    }

    #[test]
    fn accepts_a_compliant_password() {
        let check = validate_password("Secret123!");
        assert!(check.is_valid, "unexpected errors: {:?}", check.errors);
        assert!(check.errors.is_empty());
    }

    #[test]
    fn temp_passwords_satisfy_the_policy() {
        for name in ["maria", "AL", "j", "", "élodie", "von der Leyen"] {
            let password = generate_temp_password(name);
            let check = validate_password(&password);
            assert!(
                check.is_valid,
                "{:?} -> {:?} violates {:?}",
                name, password, check.errors
            );
        }
    }

    #[test]
    fn temp_password_starts_with_capitalized_name() {
        let password = generate_temp_password("maria");
        assert!(password.starts_with("Maria"), "got {:?}", password);
    }

    #[test]
    fn secure_passwords_satisfy_the_policy() {
        for _ in 0..50 {
            let password = generate_secure_password();
            let check = validate_password(&password);
            assert!(check.is_valid, "{:?} violates {:?}", password, check.errors);
        }
    }
}
