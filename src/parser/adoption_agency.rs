use crate::node::{Node, NodeId, HTML_NAMESPACE};
use crate::parser::{ActiveElement, Html5Parser, Scope};

const OUTER_LOOP_DEPTH: usize = 8;
const INNER_LOOP_DEPTH: usize = 3;

/// Outcome of the adoption agency algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionResult {
    /// The end tag was handled
    Completed,
    /// No matching formatting element; the caller falls back to the
    /// any-other-end-tag rules
    ProcessAsAnyOther,
}

impl Html5Parser {
    /// The adoption agency algorithm, which untangles misnested formatting
    /// elements such as `<b>1<p>2</b>3`. `subject` is the tag name of the
    /// end tag that triggered it.
    pub(crate) fn run_adoption_agency(&mut self, subject: &str) -> AdoptionResult {
        // Step 1-2: a matching current node that is not an active formatting
        // element is simply popped
        let current_id = self.current_node_id();
        if self.node_name(current_id) == subject
            && !self
                .active_formatting_elements
                .contains(&ActiveElement::NodeId(current_id))
        {
            self.open_elements.pop();
            return AdoptionResult::Completed;
        }

        for _ in 0..OUTER_LOOP_DEPTH {
            // Step 4: the last matching formatting element after the last marker
            let mut formatting = None;
            for idx in (0..self.active_formatting_elements.len()).rev() {
                match self.active_formatting_elements[idx] {
                    ActiveElement::Marker => break,
                    ActiveElement::NodeId(node_id) => {
                        if self.node_name(node_id) == subject {
                            formatting = Some((idx, node_id));
                            break;
                        }
                    }
                }
            }
            let Some((formatting_list_idx, formatting_id)) = formatting else {
                return AdoptionResult::ProcessAsAnyOther;
            };

            // Step 5: in the list but no longer open
            let Some(formatting_stack_idx) = self
                .open_elements
                .iter()
                .position(|&id| id == formatting_id)
            else {
                self.parse_error("formatting element is no longer open");
                self.active_formatting_elements.remove(formatting_list_idx);
                return AdoptionResult::Completed;
            };

            // Step 6: open but out of scope
            if !self.element_in_scope(formatting_id, Scope::Regular) {
                self.parse_error("formatting element is out of scope");
                return AdoptionResult::Completed;
            }

            // Step 7
            if formatting_id != self.current_node_id() {
                self.parse_error("formatting element closes other open elements");
            }

            // Step 8: the furthest block is the topmost special element
            // below the formatting element
            let furthest = self.open_elements[formatting_stack_idx + 1..]
                .iter()
                .position(|&id| {
                    self.document
                        .get_node_by_id(id)
                        .is_some_and(|n| n.is_special())
                })
                .map(|offset| formatting_stack_idx + 1 + offset);

            // Step 9: without a furthest block everything above the
            // formatting element closes with it
            let Some(furthest_idx) = furthest else {
                while let Some(node_id) = self.open_elements.pop() {
                    if node_id == formatting_id {
                        break;
                    }
                }
                self.active_formatting_elements.remove(formatting_list_idx);
                return AdoptionResult::Completed;
            };
            let furthest_id = self.open_elements[furthest_idx];

            // Step 10
            let common_ancestor = self.open_elements[formatting_stack_idx - 1];

            // Step 11: the bookmark marks where the rebuilt formatting
            // element goes into the list
            let mut bookmark = formatting_list_idx;

            // Step 12-13: walk up from the furthest block, cloning every
            // formatting element in between and hanging the chain together
            let mut node_idx = furthest_idx;
            let mut last_node = furthest_id;
            let mut inner_count = 0;
            loop {
                node_idx -= 1;
                let node_id = self.open_elements[node_idx];
                if node_id == formatting_id {
                    break;
                }
                inner_count += 1;

                let list_pos = self
                    .active_formatting_elements
                    .iter()
                    .position(|e| *e == ActiveElement::NodeId(node_id));

                // elements past the loop limit or not in the list drop out
                // of both structures
                if inner_count > INNER_LOOP_DEPTH || list_pos.is_none() {
                    if let Some(pos) = list_pos {
                        self.active_formatting_elements.remove(pos);
                        if pos < bookmark {
                            bookmark -= 1;
                        }
                    }
                    self.open_elements.remove(node_idx);
                    continue;
                }
                let Some(list_pos) = list_pos else {
                    continue;
                };

                // replace the node with a fresh clone in both structures
                let (name, attributes) = match self.document.get_node_by_id(node_id) {
                    Some(node) => (node.name.clone(), node.attributes().to_vec()),
                    None => continue,
                };
                let clone = Node::new_element(&name, attributes, HTML_NAMESPACE);
                let clone_id = self.document.register_node(clone);
                self.active_formatting_elements[list_pos] = ActiveElement::NodeId(clone_id);
                self.open_elements[node_idx] = clone_id;

                if last_node == furthest_id {
                    bookmark = list_pos + 1;
                }

                self.document.append(last_node, clone_id);
                last_node = clone_id;
            }

            // Step 14: the chain moves to where the common ancestor would
            // insert it, fostering it out of a table if needed
            self.document.detach(last_node);
            self.insert_node_with_target(last_node, common_ancestor);

            // Step 15-17: a fresh clone of the formatting element adopts all
            // children of the furthest block
            let (name, attributes) = match self.document.get_node_by_id(formatting_id) {
                Some(node) => (node.name.clone(), node.attributes().to_vec()),
                None => return AdoptionResult::Completed,
            };
            let new_formatting = Node::new_element(&name, attributes, HTML_NAMESPACE);
            let new_formatting_id = self.document.register_node(new_formatting);

            let children: Vec<NodeId> = self
                .document
                .get_node_by_id(furthest_id)
                .map(|n| n.children.clone())
                .unwrap_or_default();
            for child_id in children {
                self.document.append(child_id, new_formatting_id);
            }
            self.document.append(new_formatting_id, furthest_id);

            // Step 18: the list entry moves to the bookmark
            if let Some(pos) = self
                .active_formatting_elements
                .iter()
                .position(|e| *e == ActiveElement::NodeId(formatting_id))
            {
                self.active_formatting_elements.remove(pos);
                if pos < bookmark {
                    bookmark -= 1;
                }
            }
            let bookmark = bookmark.min(self.active_formatting_elements.len());
            self.active_formatting_elements
                .insert(bookmark, ActiveElement::NodeId(new_formatting_id));

            // Step 19: on the stack the new element sits right above the
            // furthest block
            self.open_elements.retain(|&id| id != formatting_id);
            if let Some(pos) = self.open_elements.iter().position(|&id| id == furthest_id) {
                self.open_elements.insert(pos + 1, new_formatting_id);
            }
        }

        AdoptionResult::Completed
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::Html5Parser;

    fn tree(input: &str) -> String {
        Html5Parser::parse_str(input).document().tree_format()
    }

    #[test]
    fn misnested_bold_is_split_around_the_paragraph() {
        assert_eq!(
            tree("<!DOCTYPE html><b>1<p>2</b>3"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <b>\n",
                "|       \"1\"\n",
                "|     <p>\n",
                "|       <b>\n",
                "|         \"2\"\n",
                "|       \"3\"\n",
            )
        );
    }

    #[test]
    fn overlapping_anchors_are_untangled() {
        assert_eq!(
            tree("<!DOCTYPE html><a href=x>1<b>2<a href=y>3</b>4</a>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <a>\n",
                "|       href=\"x\"\n",
                "|       \"1\"\n",
                "|       <b>\n",
                "|         \"2\"\n",
                "|     <b>\n",
                "|       <a>\n",
                "|         href=\"y\"\n",
                "|         \"3\"\n",
                "|     <a>\n",
                "|       href=\"y\"\n",
                "|       \"4\"\n",
            )
        );
    }

    #[test]
    fn end_tag_without_formatting_element_is_ignored() {
        assert_eq!(
            tree("<!DOCTYPE html><p>x</b>y"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <p>\n",
                "|       \"xy\"\n",
            )
        );
    }

    #[test]
    fn block_inside_formatting_moves_out() {
        // the div moves next to the first a; the b is carried into the
        // reopened a and reconstructed again for the trailing text
        assert_eq!(
            tree("<!DOCTYPE html><a><div><b></a>x"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <a>\n",
                "|     <div>\n",
                "|       <a>\n",
                "|         <b>\n",
                "|       <b>\n",
                "|         \"x\"\n",
            )
        );
    }
}
