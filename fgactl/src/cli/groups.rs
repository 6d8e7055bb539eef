use anyhow::Result;
use clap::Args;
use fga_core::flickr::GroupSummary;
use fga_model::UserId;

use super::Context;

#[derive(Args, Debug)]
pub struct GroupsOptions {
    /// NSID of a user with configured credentials
    #[arg(long)]
    pub user: String,
}

pub async fn list_groups(ctx: &Context, opts: &GroupsOptions) -> Result<()> {
    let user = UserId::parse(&opts.user)?;
    let flickr = ctx.flickr()?;

    let groups = flickr.list_user_group_details(&user).await?;
    for line in display_lines(&groups) {
        println!("{line}");
    }
    Ok(())
}

/// `name (nsid)` lines ordered case-insensitively on the whole line.
fn display_lines(groups: &[GroupSummary]) -> Vec<String> {
    let mut lines: Vec<String> =
        groups.iter().map(GroupSummary::display_line).collect();
    lines.sort_by_cached_key(|line| line.to_lowercase());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, nsid: &str) -> GroupSummary {
        GroupSummary {
            nsid: nsid.into(),
            name: name.into(),
        }
    }

    #[test]
    fn same_named_groups_are_ordered_by_nsid() {
        let groups = [
            group("street", "900@N01"),
            group("Black and White", "52240293230@N01"),
            group("Street", "100@N01"),
        ];
        assert_eq!(
            display_lines(&groups),
            [
                "Black and White (52240293230@N01)",
                "Street (100@N01)",
                "street (900@N01)",
            ]
        );
    }
}
